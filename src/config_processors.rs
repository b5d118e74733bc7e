use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem};

/// Strip surrounding quotes from configuration strings.
pub trait Dequote
where
    Self: Sized,
{
    fn dequote(self) -> Result<StringItem, ConfigError>;
}

impl Dequote for Result<StringItem, ConfigError> {
    /// Trims every configuration value and removes one pair of matching
    /// surrounding quotes, double (`"`) or single (`'`). Values without
    /// quotes pass through unchanged.
    ///
    /// ## Example
    ///
    /// ```rust
    /// # use justconfig::Config;
    /// # use justconfig::ConfPath;
    /// # use justconfig::item::ValueExtractor;
    /// # use justconfig::sources::defaults::Defaults;
    /// # use cadenza::config_processors::Dequote;
    /// #
    /// # let mut conf = Config::default();
    /// # let mut defaults = Defaults::default();
    /// defaults.set(conf.root().push_all(&["quoted"]), "'abc'", "source info");
    /// conf.add_source(defaults);
    ///
    /// let value: String = conf.get(ConfPath::from(&["quoted"])).dequote().value().unwrap();
    ///
    /// assert_eq!(value, "abc");
    /// ```
    fn dequote(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| {
            let v = v.trim();

            let quoted = v.len() >= 2
                && ((v.starts_with('"') && v.ends_with('"'))
                    || (v.starts_with('\'') && v.ends_with('\'')));

            if quoted {
                MapAction::Replace(vec![v[1..v.len() - 1].to_owned()])
            } else {
                MapAction::Keep
            }
        })
    }
}
