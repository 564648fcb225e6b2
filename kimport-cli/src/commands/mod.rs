pub mod generate;
pub mod validate;

use crate::cli::SourceArg;
use crate::error::{CliError, CliResult};
use kimport_tabular::{read_csv_path, CsvReadOptions, SourceRegistry};

/// Load every `NAME=PATH` source into one registry.
pub(crate) fn load_sources(sources: &[SourceArg], opts: &CsvReadOptions) -> CliResult<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    for source in sources {
        if registry.get(&source.name).is_some() {
            return Err(CliError::Usage(format!(
                "source table '{}' given more than once",
                source.name
            )));
        }
        let table = read_csv_path(source.name.as_str(), &source.path, opts)?;
        tracing::info!(
            table = %source.name,
            path = %source.path.display(),
            rows = table.num_rows(),
            columns = table.column_names().len(),
            "loaded source table"
        );
        registry.insert(table)?;
    }
    Ok(registry)
}
