use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{Error, Result};

/// Console logging on stderr, plus a plain-text copy in `log_file` when given.
///
/// Keep the returned guard alive for the whole run; dropping it flushes the file.
pub fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(parse_directive("readmegen=info")?)
        .add_directive(parse_directive("reqwest=warn")?);

    let (file, guard) = match log_file {
        Some(path) => {
            let (layer, guard) = file_layer(path)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file)
        .init();

    Ok(guard)
}

/// Non-blocking fmt layer appending to `path`; parent directories are created.
pub fn file_layer<S>(path: &Path) -> Result<(impl Layer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("log path {} has no file name", path.display())))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer().with_ansi(false).with_writer(writer);

    Ok((layer, guard))
}

fn parse_directive(directive: &str) -> Result<tracing_subscriber::filter::Directive> {
    directive
        .parse()
        .map_err(|e| Error::Config(format!("bad log directive {}: {}", directive, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_layer_writes_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("scraper.log");

        let (layer, guard) = file_layer(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Starting complete scrape for user: octocat");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Starting complete scrape for user: octocat"));
        assert!(contents.contains("INFO"));
    }

    #[test]
    fn test_file_layer_rejects_directory_only_path() {
        let result = file_layer::<tracing_subscriber::Registry>(Path::new("/"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
