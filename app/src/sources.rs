use common::{config::Config, source::Source};
use eyre::{Result, bail};
use raw_log::RawLog;
use tabulated::Tabulated;

/// Sources used when the config does not list any
pub fn default_sources() -> Vec<Box<dyn Source>> {
    vec![Box::new(Tabulated::default()), Box::new(RawLog::default())]
}

/// The config's sources, or the defaults, restricted to `names` when given
pub fn select(config: &Config, names: &[String]) -> Result<Vec<Box<dyn Source>>> {
    let sources = if config.sources.is_empty() {
        default_sources()
    } else {
        config.sources.clone()
    };
    if names.is_empty() {
        return Ok(sources);
    }

    for name in names {
        if !sources.iter().any(|s| s.name() == name) {
            bail!(
                "Unknown source {name}, available: {}",
                sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
            );
        }
    }
    Ok(sources
        .into_iter()
        .filter(|s| names.iter().any(|n| n == s.name()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_config_is_empty() {
        let sources = select(&Config::default(), &[]).unwrap();
        let names = sources.iter().map(|s| s.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["tabulated", "raw-log"]);
    }

    #[test]
    fn filters_by_name() {
        let sources = select(&Config::default(), &["raw-log".to_owned()]).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "raw-log");
        assert!(select(&Config::default(), &["nope".to_owned()]).is_err());
    }

    #[test]
    fn sources_from_config() {
        let config = Config::parse(
            "sources:\n  - type: RawLog\n    path: logs.csv\n    operations: [create_post]\n",
        )
        .unwrap();
        let sources = select(&config, &[]).unwrap();
        assert_eq!(sources.len(), 1);
        // 6 latency stats and one success chart for the operation, plus cycle
        assert_eq!(sources[0].charts().len(), 8);
    }
}
