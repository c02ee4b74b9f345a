//! TestRepo builder for integration tests
//!
//! Provides a temp project directory plus a few pre-built layouts mixing
//! plain scripts with HTML and YAML host documents.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use embedscan::NormalizedPath;
use tempfile::TempDir;

/// Builder for creating test project structures
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new empty test project
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the path to the project root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Project root as a normalized path
    pub fn base_dir(&self) -> NormalizedPath {
        NormalizedPath::new(self.dir.path())
    }

    /// Normalized path of a file inside the project
    pub fn file(&self, relative_path: &str) -> NormalizedPath {
        self.base_dir().join(relative_path)
    }

    /// Add a file with the given content
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    /// Add an empty file
    pub fn add_empty_file(&self, relative_path: &str) -> &Self {
        self.add_file(relative_path, "")
    }

    /// Add a CloudFormation template with one Node.js Lambda holding `code` inline
    pub fn add_lambda_template(&self, relative_path: &str, resource: &str, code: &str) -> &Self {
        let mut template = format!(
            "Resources:\n  {}:\n    Type: AWS::Lambda::Function\n    Properties:\n      Runtime: nodejs18.x\n      Code:\n        ZipFile: |\n",
            resource
        );
        for line in code.lines() {
            template.push_str("          ");
            template.push_str(line);
            template.push('\n');
        }
        self.add_file(relative_path, &template)
    }

    /// Add an HTML page with one inline script
    pub fn add_html_page(&self, relative_path: &str, script: &str) -> &Self {
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<body>\n<script>\n{}\n</script>\n</body>\n</html>\n",
            script
        );
        self.add_file(relative_path, &page)
    }

    /// Run the embedscan binary inside the project and return its output
    pub fn run_cli(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_embedscan"))
            .current_dir(self.path())
            .env("RUST_LOG", "off")
            .args(args)
            .output()
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run CLI and expect failure, return (stdout, stderr)
    pub fn run_cli_failure(&self, args: &[&str]) -> (String, String) {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            !output.status.success(),
            "CLI command {:?} should have failed",
            args
        );
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }

    // ========================================================================
    // PRE-BUILT PROJECT STRUCTURES
    // ========================================================================

    /// Scripts, a page and a template, plus a dependency tree that must be skipped
    pub fn with_mixed_layout(&self) -> &Self {
        self.add_file("package.json", r#"{ "name": "mixed", "dependencies": { "left-pad": "1.0.0" } }"#)
            .add_file("src/app.js", "function main() {\n  debugger;\n}\n")
            .add_file("src/util.ts", "export const x: number = 1;\n")
            .add_html_page("public/index.html", "if (a == b) { go(); }")
            .add_lambda_template("infra/template.yaml", "Handler", "exports.handler = () => {\n  debugger;\n};")
            .add_file("node_modules/left-pad/index.js", "debugger;\n")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
