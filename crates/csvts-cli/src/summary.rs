use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use csvts_core::{AggregatePoint, IngestReport, TableView};
use csvts_model::{TypeTag, Upload};

pub fn print_ingest_summary(report: &IngestReport) {
    println!("Upload: {}", report.upload.id);
    println!("File: {}", report.upload.file_name);
    if let Some(blob) = &report.blob {
        println!("Archived: {}", blob.path.display());
    }

    let mut columns = Table::new();
    columns.set_header(vec![
        header_cell("#"),
        header_cell("Column"),
        header_cell("Type"),
    ]);
    apply_summary_table_style(&mut columns);
    align_column(&mut columns, 0, CellAlignment::Right);
    for header in &report.schema.headers {
        columns.add_row(vec![
            Cell::new(header.position),
            Cell::new(&header.header_name),
            type_cell(header.type_tag),
        ]);
    }
    println!("{columns}");

    let stats = &report.stats;
    let mut rows = Table::new();
    rows.set_header(vec![header_cell("Rows"), header_cell("Count")]);
    apply_summary_table_style(&mut rows);
    align_column(&mut rows, 1, CellAlignment::Right);
    rows.add_row(vec![Cell::new("Read"), Cell::new(stats.total_rows)]);
    rows.add_row(vec![
        Cell::new("Invalid timestamp"),
        count_cell(stats.invalid_timestamp, Color::Yellow),
    ]);
    rows.add_row(vec![
        Cell::new("No values"),
        count_cell(stats.empty_rows, Color::Yellow),
    ]);
    rows.add_row(vec![
        Cell::new("Stored")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(stats.kept).add_attribute(Attribute::Bold),
    ]);
    println!("{rows}");
}

pub fn print_rows(view: &TableView) {
    let mut table = Table::new();
    table.set_header(view.columns().into_iter().map(header_cell).collect::<Vec<_>>());
    apply_table_style(&mut table);
    for row in view.dense_rows() {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|cell| match cell {
                Some(value) => Cell::new(value),
                None => dim_cell("-"),
            })
            .collect();
        table.add_row(cells);
    }
    println!("{table}");
    println!("{} record(s)", view.len());
}

pub fn print_aggregate(points: &[AggregatePoint]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Period"),
        header_cell("Value"),
        header_cell("Count"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for point in points {
        table.add_row(vec![
            Cell::new(&point.period),
            Cell::new(point.value),
            Cell::new(point.count),
        ]);
    }
    println!("{table}");
}

pub fn print_uploads(uploads: &[Upload]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("File"),
        header_cell("Client"),
        header_cell("Created"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for upload in uploads {
        table.add_row(vec![
            Cell::new(upload.id),
            Cell::new(&upload.file_name),
            Cell::new(&upload.client_address),
            Cell::new(upload.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }
    println!("{table}");
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn type_cell(tag: TypeTag) -> Cell {
    let color = match tag {
        TypeTag::Timestamp => Color::Magenta,
        TypeTag::Int | TypeTag::Float => Color::Green,
        TypeTag::Str => Color::White,
    };
    Cell::new(tag).fg(color)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
