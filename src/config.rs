use std::fmt;
use std::sync::Arc;

/// Read-only codec settings, built once and cloned into each call.
#[derive(Clone, Default)]
pub struct Config {
    debug_hook: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Route the codec's debug messages to `hook` instead of the `log` facade.
    pub fn debug_hook<F>(mut self, hook: F) -> Config
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug_hook = Some(Arc::new(hook));
        self
    }

    pub(crate) fn debug(&self, args: fmt::Arguments) {
        match self.debug_hook {
            Some(ref hook) => hook(&args.to_string()),
            None => debug!("{}", args),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("debug_hook", &self.debug_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::sync::{Arc, Mutex};

    #[test]
    fn debug_messages_reach_the_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = Config::new().debug_hook(move |msg| sink.lock().unwrap().push(msg.to_string()));

        config.debug(format_args!("new param {}", 1));

        assert_eq!(vec!["new param 1".to_string()], *seen.lock().unwrap());
    }
}
