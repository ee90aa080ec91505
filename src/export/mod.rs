use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::facets::{CombinedResult, Dimension};

/// Export format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    #[default]
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
            ExportFormat::Text => "text",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => bail!("Unknown export format '{}' (expected json, csv or text)", other),
        }
    }
}

/// Write `result` to `output_path`, or to stdout when no path is given.
pub fn export_result(
    result: &CombinedResult,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(path)?;
            write_result(result, format, file)?;
            tracing::info!(path = %path.display(), format = format.name(), "Exported analysis");
        }
        None => write_result(result, format, std::io::stdout().lock())?,
    }
    Ok(())
}

pub fn write_result<W: Write>(result: &CombinedResult, format: ExportFormat, mut out: W) -> Result<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, result)?;
            writeln!(out)?;
        }
        ExportFormat::Csv => write_csv(result, out)?,
        ExportFormat::Text => out.write_all(render_text(result).as_bytes())?,
    }
    Ok(())
}

fn write_csv<W: Write>(result: &CombinedResult, out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["facet", "value", "count", "degraded"])?;

    for dimension in Dimension::ALL {
        let Some(distribution) = result.facet_distribution(dimension) else {
            continue;
        };
        let degraded = result
            .facets
            .get(&dimension.facet())
            .is_some_and(|f| f.degraded);
        for entry in distribution.entries() {
            let count = entry.count.to_string();
            wtr.write_record([
                dimension.name(),
                entry.value.as_str(),
                count.as_str(),
                if degraded { "true" } else { "false" },
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn render_text(result: &CombinedResult) -> String {
    let mut text = String::new();
    let applied = &result.applied;

    let _ = writeln!(text, "Filter: {}", result.filter.signature());
    if !result.implied_categories.is_empty() {
        let implied: Vec<&str> = result.implied_categories.iter().map(String::as_str).collect();
        let _ = writeln!(text, "Implied categories: {}", implied.join(", "));
    }
    let _ = writeln!(
        text,
        "Photos: {}  Sessions: {}",
        applied.total_photos, applied.total_sessions
    );
    match applied.hit_rate {
        Some(rate) => {
            let _ = writeln!(
                text,
                "Hit rate: {:.1}% ({}/{})",
                rate, applied.hit_rate_numerator, applied.hit_rate_denominator
            );
        }
        None => {
            let _ = writeln!(text, "Hit rate: n/a");
        }
    }

    for dimension in Dimension::ALL {
        let Some(distribution) = result.facet_distribution(dimension) else {
            continue;
        };
        let degraded = result
            .facets
            .get(&dimension.facet())
            .is_some_and(|f| f.degraded);
        let _ = writeln!(
            text,
            "\n{}{}",
            dimension,
            if degraded { " (degraded)" } else { "" }
        );
        let width = distribution.labels().map(str::len).max().unwrap_or(0);
        for entry in distribution.entries() {
            let _ = writeln!(text, "  {:<width$}  {}", entry.value, entry.count, width = width);
        }
    }

    if !applied.day_of_week.is_empty() {
        let _ = writeln!(text, "\nday_of_week");
        for entry in applied.day_of_week.entries() {
            let _ = writeln!(text, "  {:<9}  {}", entry.value, entry.count);
        }
    }

    let focal = &applied.focal_lengths;
    if !focal.primes.is_empty() || !focal.zoom_ranges.is_empty() {
        let _ = writeln!(
            text,
            "\nfocal lengths: {} prime, {} zoom",
            focal.prime_total(),
            focal.zoom_total()
        );
        for (label, count) in &focal.primes {
            let _ = writeln!(text, "  {}mm  {}", label, count);
        }
        for (label, count) in &focal.zoom_ranges {
            let _ = writeln!(text, "  {}mm  {}", label, count);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::corpus::{MemoryCorpus, Photo, Session};
    use crate::facets::{FacetEngine, FilterState};
    use std::sync::Arc;

    async fn analysed() -> CombinedResult {
        let session = Session {
            id: 1,
            name: "s".into(),
            category: "Sport".into(),
            group: "Run".into(),
            total_photos: 2,
            total_raw_photos: Some(8),
        };
        let photos = vec![
            Photo { id: 1, session_id: 1, camera: Some("A".into()), focal_length: Some(50.0), category: "Sport".into(), group: "Run".into(), ..Default::default() },
            Photo { id: 2, session_id: 1, camera: Some("B".into()), focal_length: Some(73.0), category: "Sport".into(), group: "Run".into(), ..Default::default() },
        ];
        let engine = FacetEngine::new(Arc::new(MemoryCorpus::new(vec![session], photos)), &Config::default());
        let filter = FilterState::new().set_single(Dimension::Camera, "A").unwrap();
        engine.resolve(filter).await.unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("html".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_csv_rows() {
        let result = analysed().await;
        let mut out = Vec::new();
        write_result(&result, ExportFormat::Csv, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("facet,value,count,degraded"));
        assert!(csv.contains("camera,A,1,false"));
        assert!(csv.contains("camera,B,1,false"));
        assert!(csv.contains("focal_length,73,0,false"));
    }

    #[tokio::test]
    async fn test_json_is_parseable() {
        let result = analysed().await;
        let mut out = Vec::new();
        write_result(&result, ExportFormat::Json, &mut out).unwrap();
        let parsed: CombinedResult = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, result);
    }

    #[tokio::test]
    async fn test_text_report() {
        let text = render_text(&analysed().await);
        assert!(text.contains("Photos: 1  Sessions: 1"));
        assert!(text.contains("Hit rate: 25.0% (2/8)"));
        assert!(text.contains("\ncamera\n"));
        assert!(text.contains("focal lengths: 1 prime, 0 zoom"));
    }

    #[tokio::test]
    async fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("analysis.{}", ExportFormat::Json.extension()));
        export_result(&analysed().await, ExportFormat::Json, Some(&path)).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"applied\""));
    }
}
