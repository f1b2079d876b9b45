//! CLI definition for the `doctrack` command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doctrack_fields::DocumentCategory;

/// doctrack - typed fields for tracked documents
///
/// Inspect the document types, check a value map against one, and keep
/// per-document field values in a local database.
#[derive(Parser, Debug)]
#[command(name = "doctrack")]
#[command(version)]
#[command(about = "Typed document fields: inspect types, validate and store values")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to doctrack.toml or doctrack.yaml in the working directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database file holding field values
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Directory with custom definitions/ and templates/
    #[arg(long, global = true, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List document types
    Types {
        /// Only show types in this category
        #[arg(long, value_parser = parse_category)]
        category: Option<DocumentCategory>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every field of a document type
    Show {
        /// Document type key (e.g. passport)
        type_key: String,
    },
    /// Render the visible sections of a form for a value map
    Form {
        /// Document type key
        type_key: String,
        /// JSON or YAML file with field values
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,
    },
    /// Validate a value map against a document type
    Validate {
        /// Document type key
        type_key: String,
        /// JSON or YAML file with field values
        #[arg(long, value_name = "FILE")]
        values: PathBuf,
    },
    /// Validate and store field values for a document
    Save {
        /// Document identifier
        document_id: String,
        /// Document type key
        type_key: String,
        /// JSON or YAML file with field values
        #[arg(long, value_name = "FILE")]
        values: PathBuf,
    },
    /// Print the stored field values of a document
    Load {
        /// Document identifier
        document_id: String,
        /// Output the value map as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remove every stored field value of a document
    Delete {
        /// Document identifier
        document_id: String,
    },
}

fn parse_category(s: &str) -> Result<DocumentCategory, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_types_with_category() {
        let cli = Cli::parse_from(["doctrack", "types", "--category", "travel"]);
        match cli.command {
            Commands::Types { category, json } => {
                assert_eq!(category, Some(DocumentCategory::Travel));
                assert!(!json);
            }
            other => panic!("expected Types, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(Cli::try_parse_from(["doctrack", "types", "--category", "pets"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "doctrack",
            "save",
            "doc-1",
            "passport",
            "--values",
            "values.json",
            "--database",
            "other.db",
            "--debug",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.database, Some(PathBuf::from("other.db")));
        match cli.command {
            Commands::Save {
                document_id,
                type_key,
                values,
            } => {
                assert_eq!(document_id, "doc-1");
                assert_eq!(type_key, "passport");
                assert_eq!(values, PathBuf::from("values.json"));
            }
            other => panic!("expected Save, got {other:?}"),
        }
    }

    #[test]
    fn validate_requires_values() {
        assert!(Cli::try_parse_from(["doctrack", "validate", "passport"]).is_err());
    }
}
