use indicatif::{ProgressStyle, style::TemplateError};

/// Style of the bar attached to the whole run.
pub(crate) fn get_style_run() -> Result<ProgressStyle, TemplateError> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("=>-"))
}

/// Style of a single edge being resolved, no progress.
pub(crate) fn get_style_edge() -> Result<ProgressStyle, TemplateError> {
    ProgressStyle::default_spinner().template("{spinner:.blue} {span_name} {msg}")
}
