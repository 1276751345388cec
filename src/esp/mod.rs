// esp/mod.rs

mod storage;
pub use storage::*;

mod wifi;
pub use wifi::*;

mod sensors;
pub use sensors::*;

#[cfg(feature = "esp-wroom-32")]
mod camera;
#[cfg(feature = "esp-wroom-32")]
pub use camera::*;

// EOF
