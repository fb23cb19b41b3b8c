// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Thin flag-style surface over execute, resume, rewind, and delete

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(about = "A persistent, hierarchical workflow engine")]
#[command(version)]
pub struct Args {
    #[arg(
        long,
        default_value = "info",
        help = "Log level (debug, verbose, info, warn, error)"
    )]
    pub log: String,

    #[arg(long, help = "Path to a workflow definition (JSON or YAML)")]
    pub file: Option<PathBuf>,

    #[arg(long, help = "Workflow instance id to retrieve or resume")]
    pub id: Option<String>,

    #[arg(
        long,
        help = "Path to a JSON task-update bundle to inject into --id"
    )]
    pub tasks: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 0,
        help = "Retrieve the instance N save points back"
    )]
    pub rewind: usize,

    #[arg(long, value_name = "ID", help = "Delete one instance and its history")]
    pub delete: Option<String>,

    #[arg(
        long = "deleteALL",
        alias = "delete-all",
        help = "Delete all instances and their history"
    )]
    pub delete_all: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["trellis"]);
        assert_eq!(args.log, "info");
        assert_eq!(args.rewind, 0);
        assert!(!args.delete_all);
        assert!(args.file.is_none());
    }

    #[test]
    fn test_execute_flags() {
        let args = Args::parse_from(["trellis", "--file", "wf.yaml", "--log", "debug"]);
        assert_eq!(args.file, Some(PathBuf::from("wf.yaml")));
        assert_eq!(args.log, "debug");
    }

    #[test]
    fn test_resume_flags() {
        let args = Args::parse_from(["trellis", "--id", "abc", "--tasks", "updates.json"]);
        assert_eq!(args.id.as_deref(), Some("abc"));
        assert_eq!(args.tasks, Some(PathBuf::from("updates.json")));
    }

    #[test]
    fn test_delete_all_spelling() {
        let args = Args::parse_from(["trellis", "--deleteALL"]);
        assert!(args.delete_all);
        let args = Args::parse_from(["trellis", "--delete-all"]);
        assert!(args.delete_all);
    }
}
