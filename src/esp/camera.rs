// esp/camera.rs

use std::{marker::PhantomData, ptr::NonNull};

use esp_idf_sys::{camera, esp};

use crate::*;

// AI Thinker ESP32-CAM
const PIN_PWDN: i32 = 32;
const PIN_RESET: i32 = -1;
const PIN_XCLK: i32 = 0;
const PIN_SIOD: i32 = 26;
const PIN_SIOC: i32 = 27;
const PIN_D: [i32; 8] = [5, 18, 19, 21, 36, 39, 34, 35];
const PIN_VSYNC: i32 = 25;
const PIN_HREF: i32 = 23;
const PIN_PCLK: i32 = 22;

const XCLK_FREQ_HZ: i32 = 20_000_000;
const JPEG_QUALITY: i32 = 50;

/// The esp32-camera driver. There is only one per chip.
pub struct EspCamera {
    _not_send: PhantomData<*const ()>,
}

impl EspCamera {
    /// QVGA JPEG, one frame buffer in PSRAM, grab when empty.
    pub fn init() -> anyhow::Result<Self> {
        let config = camera::camera_config_t {
            pin_pwdn: PIN_PWDN,
            pin_reset: PIN_RESET,
            pin_xclk: PIN_XCLK,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: PIN_SIOD,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: PIN_SIOC,
            },
            pin_d0: PIN_D[0],
            pin_d1: PIN_D[1],
            pin_d2: PIN_D[2],
            pin_d3: PIN_D[3],
            pin_d4: PIN_D[4],
            pin_d5: PIN_D[5],
            pin_d6: PIN_D[6],
            pin_d7: PIN_D[7],
            pin_vsync: PIN_VSYNC,
            pin_href: PIN_HREF,
            pin_pclk: PIN_PCLK,

            xclk_freq_hz: XCLK_FREQ_HZ,
            ledc_timer: camera::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: camera::ledc_channel_t_LEDC_CHANNEL_0,

            pixel_format: camera::pixformat_t_PIXFORMAT_JPEG,
            frame_size: camera::framesize_t_FRAMESIZE_QVGA,
            jpeg_quality: JPEG_QUALITY,
            fb_count: 1,
            fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            ..Default::default()
        };

        esp!(unsafe { camera::esp_camera_init(&config) })?;
        info!("Camera initialized");
        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for EspCamera {
    fn drop(&mut self) {
        unsafe {
            camera::esp_camera_deinit();
        }
    }
}

/// A driver-owned frame buffer, returned to the driver on drop.
pub struct EspFrame<'a> {
    fb: NonNull<camera::camera_fb_t>,
    _camera: PhantomData<&'a mut EspCamera>,
}

impl AsRef<[u8]> for EspFrame<'_> {
    fn as_ref(&self) -> &[u8] {
        // buf/len stay valid until the buffer is handed back
        unsafe {
            let fb = self.fb.as_ref();
            std::slice::from_raw_parts(fb.buf, fb.len)
        }
    }
}

impl Drop for EspFrame<'_> {
    fn drop(&mut self) {
        unsafe { camera::esp_camera_fb_return(self.fb.as_ptr()) }
    }
}

impl FrameSource for EspCamera {
    type Frame<'a> = EspFrame<'a>;

    fn capture(&mut self) -> Option<EspFrame<'_>> {
        let fb = NonNull::new(unsafe { camera::esp_camera_fb_get() })?;
        Some(EspFrame {
            fb,
            _camera: PhantomData,
        })
    }
}

// EOF
