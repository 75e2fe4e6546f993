//! Interactive shell over one in-memory catalog.
//!
//! One statement (or meta command) per line. `\dt` lists relations,
//! `\d <name>` describes a table, `\p <sql>` prints the canonical code of a
//! statement without executing it.

use std::io::{self, BufRead, Write};

use shaledb::ast::{SelectStatement, Statement};
use shaledb::parser::parse;
use shaledb::storage::{ColumnType, MemoryBackend, StorageError};

/// Print an aligned text table with a header row.
fn render_table(header: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let render_row = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell))
            .collect();
        println!("  {}", padded.join(" | "));
    };

    render_row(header);
    let total: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    println!("  {}", "-".repeat(total));
    for row in rows {
        render_row(row);
    }
}

fn do_select(backend: &MemoryBackend, stmt: &SelectStatement) -> Result<(), StorageError> {
    let results = backend.select(stmt)?;

    if results.rows.is_empty() {
        println!("(no results)");
        return Ok(());
    }

    let header: Vec<String> = results.columns.iter().map(|c| c.name.clone()).collect();
    let mut rows = Vec::with_capacity(results.rows.len());
    for result in &results.rows {
        let mut row = Vec::with_capacity(result.len());
        for (i, cell) in result.iter().enumerate() {
            let rendered = match results.columns[i].column_type {
                ColumnType::Int => cell.as_int().map(|v| v.to_string()),
                ColumnType::Text => cell.as_text().map(|s| s.to_string()),
                ColumnType::Bool => cell
                    .as_bool()
                    .map(|b| if b { "t".to_string() } else { "f".to_string() }),
            };
            row.push(rendered.unwrap_or_default());
        }
        rows.push(row);
    }

    render_table(&header, &rows);
    if rows.len() == 1 {
        println!("(1 result)");
    } else {
        println!("({} results)", rows.len());
    }
    Ok(())
}

fn describe_tables(backend: &MemoryBackend) {
    let tables = backend.get_tables();
    if tables.is_empty() {
        println!("Did not find any relations.");
        return;
    }

    println!("List of relations");
    let header = vec!["Name".to_string(), "Type".to_string()];
    let rows: Vec<Vec<String>> = tables
        .iter()
        .map(|t| vec![t.name.clone(), "table".to_string()])
        .collect();
    render_table(&header, &rows);
    println!();
}

fn describe_table(backend: &MemoryBackend, name: &str) {
    if name.is_empty() {
        // psql behavior: \d with no name lists everything.
        describe_tables(backend);
        return;
    }

    let tables = backend.get_tables();
    let Some(table) = tables.iter().find(|t| t.name == name) else {
        println!("Did not find any relation named \"{}\".", name);
        return;
    };

    println!("Table \"{}\"", name);
    let header = vec![
        "Column".to_string(),
        "Type".to_string(),
        "Nullable".to_string(),
    ];
    let rows: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.column_type.to_string(),
                if c.not_null {
                    "not null".to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect();
    render_table(&header, &rows);

    if !table.indexes.is_empty() {
        println!("Indexes:");
    }
    for index in &table.indexes {
        let mut attributes = Vec::new();
        if index.primary_key {
            attributes.push("PRIMARY KEY".to_string());
        } else if index.unique {
            attributes.push("UNIQUE".to_string());
        }
        attributes.push(index.kind.clone());
        println!("\t\"{}\" {} ({})", index.name, attributes.join(", "), index.exp);
    }

    println!();
}

fn main() {
    let mut backend = MemoryBackend::new();
    let stdin = io::stdin();

    println!("Welcome to shaledb.");
    'repl: loop {
        print!("# ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                println!("Error while reading line: {}", err);
                continue;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" || trimmed == "\\q" {
            break;
        }

        if trimmed == "\\dt" {
            describe_tables(&backend);
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("\\d") {
            describe_table(&backend, rest.trim());
            continue;
        }

        let (source, parse_only) = match trimmed.strip_prefix("\\p") {
            Some(rest) => (rest.trim(), true),
            None => (trimmed, false),
        };

        let ast = match parse(source) {
            Ok(ast) => ast,
            Err(err) => {
                println!("Error while parsing: {}", err);
                continue;
            }
        };

        for stmt in &ast.statements {
            if parse_only {
                println!("{}", stmt.generate_code());
                continue;
            }

            let result = match stmt {
                Statement::Select(select) => do_select(&backend, select),
                Statement::Insert(insert) => backend.insert(insert),
                Statement::CreateTable(create) => backend.create_table(create),
                Statement::CreateIndex(create) => backend.create_index(create),
                Statement::DropTable(drop) => backend.drop_table(drop),
            };

            if let Err(err) = result {
                println!("Error: {}", err);
                continue 'repl;
            }
        }

        if !parse_only {
            println!("ok");
        }
    }
}
