//! `tether build`: run a single build

use super::{BuildArgs, Session};
use tether_bundler::BuildReport;

pub fn execute(args: &BuildArgs) -> anyhow::Result<()> {
    let Session {
        mut bundler,
        mut tree,
        output_root,
    } = args.session()?;

    let report = bundler.build(&mut tree, &output_root)?;
    println!("{}", summary(&report));
    Ok(())
}

/// One-line description of a finished build
pub fn summary(report: &BuildReport) -> String {
    format!(
        "Wrote {} ({} modules, {} legacy files, {} bytes) in {:.2?}",
        report.output_path.display(),
        report.modules.len(),
        report.legacy_files,
        report.bytes,
        report.elapsed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_build_command_writes_artifact() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::create_dir_all(input.path().join("widgets")).unwrap();
        fs::write(input.path().join("widgets/index.js"), "index();").unwrap();
        fs::write(
            input.path().join("tether.toml"),
            "output_file = \"app.js\"\n\n[packages]\nwidgets = true\n",
        )
        .unwrap();

        let args = BuildArgs {
            config: input.path().join("tether.toml"),
            input: None,
            out: output.path().to_path_buf(),
        };
        execute(&args).unwrap();

        let artifact = fs::read_to_string(output.path().join("app.js")).unwrap();
        assert!(artifact.contains("tetherDefine(\"widgets/index\""));
    }

    #[test]
    fn test_summary() {
        let report = BuildReport {
            output_path: PathBuf::from("dist/app.js"),
            modules: vec!["a".to_string(), "b".to_string()],
            legacy_files: 1,
            bytes: 120,
            cache: Default::default(),
            elapsed: std::time::Duration::from_millis(5),
        };
        let line = summary(&report);
        assert!(line.starts_with("Wrote dist/app.js (2 modules, 1 legacy files, 120 bytes)"));
    }
}
