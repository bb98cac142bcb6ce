use std::str::FromStr;

use tracing_subscriber::{filter::LevelFilter, prelude::*, Registry};

use crate::error::Error;

#[derive(Debug)]
pub struct TraceConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

pub fn prepare_tracing(conf: TraceConfig) -> Result<(), Error> {
    let level = LevelFilter::from_str(&conf.level).map_err(|_| Error::InvalidLevel(conf.level))?;

    if conf.format == "json" {
        if let Some(path) = conf.file {
            let file = std::fs::File::create(path).map_err(Error::StdIo)?;
            Registry::default()
                .with(tracing_subscriber::fmt::Layer::new().with_writer(file).json())
                .with(level)
                .try_init()
                .map_err(|e| Error::Init(e.to_string()))
        } else {
            Registry::default()
                .with(tracing_subscriber::fmt::Layer::new().with_ansi(true).json())
                .with(level)
                .try_init()
                .map_err(|e| Error::Init(e.to_string()))
        }
    } else if let Some(path) = conf.file {
        let file = std::fs::File::create(path).map_err(Error::StdIo)?;
        Registry::default()
            .with(tracing_subscriber::fmt::Layer::new().with_writer(file))
            .with(level)
            .try_init()
            .map_err(|e| Error::Init(e.to_string()))
    } else {
        Registry::default()
            .with(tracing_subscriber::fmt::Layer::new().with_ansi(true))
            .with(level)
            .try_init()
            .map_err(|e| Error::Init(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_tracing_rejects_unknown_level() {
        let res = prepare_tracing(TraceConfig {
            level: "loud".to_string(),
            format: "plain".to_string(),
            file: None,
        });
        assert!(matches!(res, Err(Error::InvalidLevel(l)) if l == "loud"));
    }
}
