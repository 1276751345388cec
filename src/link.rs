// link.rs

use crate::*;

/// The wireless link: a cheap health check and a blocking (re)associate.
#[allow(async_fn_in_trait)]
pub trait Link {
    fn is_up(&self) -> bool;

    /// One association attempt.
    async fn associate(&mut self) -> anyhow::Result<()>;
}

/// Make sure the link is up, re-associating up to `wifi_attempts` times.
///
/// Returns false if the link is still down afterwards; callers carry on with
/// whatever work does not need the network.
pub async fn ensure_link<L: Link>(link: &mut L, config: &NodeConfig) -> bool {
    if link.is_up() {
        return true;
    }

    let attempts = config.wifi_attempts.max(1);
    warn!("WiFi down, connecting to {:?}...", config.wifi_ssid);
    for attempt in 1..=attempts {
        match link.associate().await {
            Ok(()) if link.is_up() => {
                info!("WiFi connected after {attempt} attempt(s)");
                return true;
            }
            Ok(()) => debug!("WiFi attempt {attempt}: associated but link not up yet"),
            Err(e) => debug!("WiFi attempt {attempt} failed: {e}"),
        }
        sleep(config.wifi_retry()).await;
    }

    error!("WiFi: no connection after {attempts} attempts");
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Comes up after `fail_first` failed associations.
    pub(crate) struct FlakyLink {
        pub up: bool,
        pub fail_first: u32,
        pub attempts: u32,
    }

    impl FlakyLink {
        pub(crate) fn up() -> Self {
            Self {
                up: true,
                fail_first: 0,
                attempts: 0,
            }
        }

        pub(crate) fn down(fail_first: u32) -> Self {
            Self {
                up: false,
                fail_first,
                attempts: 0,
            }
        }
    }

    impl Link for FlakyLink {
        fn is_up(&self) -> bool {
            self.up
        }

        async fn associate(&mut self) -> anyhow::Result<()> {
            self.attempts += 1;
            if self.attempts <= self.fail_first {
                bail!("no AP");
            }
            self.up = true;
            Ok(())
        }
    }

    fn fast() -> NodeConfig {
        NodeConfig {
            wifi_attempts: 4,
            wifi_retry_ms: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn up_link_is_left_alone() {
        let mut link = FlakyLink::up();
        assert!(ensure_link(&mut link, &fast()).await);
        assert_eq!(link.attempts, 0);
    }

    #[tokio::test]
    async fn retries_until_associated() {
        let mut link = FlakyLink::down(2);
        assert!(ensure_link(&mut link, &fast()).await);
        assert_eq!(link.attempts, 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let mut link = FlakyLink::down(100);
        assert!(!ensure_link(&mut link, &fast()).await);
        assert_eq!(link.attempts, 4);
        assert!(!link.is_up());
    }
}

// EOF
