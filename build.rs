// build.rs

fn main() -> anyhow::Result<()> {
    // pass ESP-IDF linker args and cfgs along when building for the device
    embuild::espidf::sysenv::output();
    Ok(())
}

// EOF
