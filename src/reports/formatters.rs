use crate::graph::ObjectGraph;
use crate::query::Selection;
use crate::reports::records::{edge_records, object_records, path_id_rows, path_rows, EdgeRecord};
use anyhow::{Context, Result};

/// Trait for selection exporters
pub trait SelectionFormatter {
    fn format(&self, graph: &ObjectGraph, selection: &Selection) -> Result<String>;
}

/// Object records as a JSON array
pub struct JsonFormatter {
    pub pretty: bool,
    pub strip_refs: bool,
}

impl SelectionFormatter for JsonFormatter {
    fn format(&self, graph: &ObjectGraph, selection: &Selection) -> Result<String> {
        let records = object_records(graph, selection, self.strip_refs);
        let output = if self.pretty {
            serde_json::to_string_pretty(&records)?
        } else {
            serde_json::to_string(&records)?
        };
        Ok(output)
    }
}

/// Edge records as CSV with a header row
pub struct CsvFormatter;

impl SelectionFormatter for CsvFormatter {
    fn format(&self, graph: &ObjectGraph, selection: &Selection) -> Result<String> {
        let mut output = EdgeRecord::COLUMNS.join(",");
        output.push('\n');
        for record in edge_records(graph, selection) {
            let fields = [
                csv_field(&record.src_id),
                csv_field(&record.src_class),
                csv_field(&record.feature),
                csv_field(&record.dst_id),
                csv_field(&record.dst_class),
                record.containment.to_string(),
            ];
            output.push_str(&fields.join(","));
            output.push('\n');
        }
        Ok(output)
    }
}

/// BFS path rows, name form
pub struct PathFormatter;

impl SelectionFormatter for PathFormatter {
    fn format(&self, graph: &ObjectGraph, selection: &Selection) -> Result<String> {
        let rows = path_rows(graph, selection).context("Path export requires --expand-from")?;
        Ok(lines(rows))
    }
}

/// BFS path rows, id form
pub struct PathIdFormatter;

impl SelectionFormatter for PathIdFormatter {
    fn format(&self, graph: &ObjectGraph, selection: &Selection) -> Result<String> {
        let rows = path_id_rows(graph, selection).context("Path id export requires --expand-from")?;
        Ok(lines(rows))
    }
}

fn lines(rows: Vec<String>) -> String {
    let mut output = rows.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

fn csv_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_graph;
    use crate::query::SelectionQuery;

    #[test]
    fn test_csv_header_and_rows() {
        let (metamodel, graph) = sample_graph();
        let selection = SelectionQuery::new()
            .with_filter("local_id in ('o1', 'o2')")
            .run(&graph, &metamodel)
            .unwrap();

        let csv = CsvFormatter.format(&graph, &selection).unwrap();
        assert_eq!(
            csv,
            "src_id,src_class,feature,dst_id,dst_class,containment\n\
             _repo,Repository,dataDictionary,o2,DataDictionary,true\n"
        );
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_json_formatter_outputs_array() {
        let (metamodel, graph) = sample_graph();
        let selection = SelectionQuery::new()
            .with_filter("eclass == 'DataType'")
            .run(&graph, &metamodel)
            .unwrap();

        let json = JsonFormatter {
            pretty: false,
            strip_refs: false,
        }
        .format(&graph, &selection)
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["id"], "_dt_text");
    }

    #[test]
    fn test_path_formatter_without_expansion_fails() {
        let (metamodel, graph) = sample_graph();
        let selection = SelectionQuery::new().run(&graph, &metamodel).unwrap();

        assert!(PathFormatter.format(&graph, &selection).is_err());
        assert!(PathIdFormatter.format(&graph, &selection).is_err());
    }
}
