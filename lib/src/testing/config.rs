const DEFAULT_ENABLED: bool = false;
const DEFAULT_VERBOSITY: Verbosity = Verbosity::Summary;
const DEFAULT_SHUTDOWN: bool = false;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Summary,
    Verbose,
}

impl Verbosity {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("quiet") {
            Verbosity::Quiet
        } else if value.eq_ignore_ascii_case("verbose") {
            Verbosity::Verbose
        } else {
            Verbosity::Summary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Summary => "summary",
            Verbosity::Verbose => "verbose",
        }
    }
}

impl core::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boot-time test settings, read from the kernel command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestConfig {
    pub enabled: bool,
    pub verbosity: Verbosity,
    /// Exit the emulator through the debug-exit port when the run ends.
    pub shutdown: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            verbosity: DEFAULT_VERBOSITY,
            shutdown: DEFAULT_SHUTDOWN,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("on")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

/// Parse `itests=`, `itests.verbosity=` and `itests.shutdown=` tokens.
/// Unknown tokens are ignored.
pub fn config_from_cmdline(cmdline: Option<&str>) -> TestConfig {
    let mut cfg = TestConfig::default();
    let Some(cmdline) = cmdline else {
        return cfg;
    };
    for token in cmdline.split_whitespace() {
        if let Some(value) = token.strip_prefix("itests=") {
            // Any non-boolean value just enables tests.
            cfg.enabled = parse_bool(value).unwrap_or(true);
            if !cfg.enabled {
                cfg.shutdown = false;
            }
        } else if let Some(value) = token.strip_prefix("itests.verbosity=") {
            cfg.verbosity = Verbosity::parse(value);
        } else if let Some(value) = token.strip_prefix("itests.shutdown=") {
            if let Some(shutdown) = parse_bool(value) {
                cfg.shutdown = shutdown;
            }
        }
    }
    cfg
}
