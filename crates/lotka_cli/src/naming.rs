use std::path::{Path, PathBuf};

/// Where rendered figures go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// `lotka_volterra_alpha=<alpha>.png` per alpha.
    PerAlpha,
    /// One caller-supplied file name for the whole sweep.
    Named(String),
}

/// Output path for the figure of sweep step `index` over `alphas`.
///
/// A named target is used verbatim when only one alpha is swept. Otherwise the
/// alpha is inserted before the extension, followed by the step index when the
/// same alpha appears more than once, so renders never overwrite each other.
pub fn artifact_path(out_dir: &Path, target: &SaveTarget, alphas: &[f64], index: usize) -> PathBuf {
    let alpha = alphas[index];
    let label = alpha.to_string();
    let tag = if alphas.iter().filter(|a| a.to_string() == label).count() > 1 {
        format!("alpha={label}_{index}")
    } else {
        format!("alpha={label}")
    };

    match target {
        SaveTarget::PerAlpha => out_dir.join(format!("lotka_volterra_{tag}.png")),
        SaveTarget::Named(name) if alphas.len() <= 1 => out_dir.join(name),
        SaveTarget::Named(name) => {
            let named = Path::new(name);
            let stem = named
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let file = match named.extension() {
                Some(ext) => format!("{stem}_{tag}.{}", ext.to_string_lossy()),
                None => format!("{stem}_{tag}"),
            };
            out_dir.join(named.with_file_name(file))
        }
    }
}
