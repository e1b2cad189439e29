use anyhow::Context;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use serde_json::Value;
use std::path::Path;

use crate::allocate::Room;
use crate::roster::Roster;

pub const SHEET_NAME: &str = "List";
pub const DEFAULT_EXPORT_FILENAME: &str = "split_exams.xlsx";

/// Blank rows between one room block's last data row and the next title.
const ROOM_GAP_ROWS: u32 = 4;
const NAME_COLUMN_WIDTH: f64 = 16.0;
const DEFAULT_COLUMN_WIDTH: f64 = 9.0;
const HEADER_FILL: &str = "D9D9D9";
const TITLE_FONT_SIZE: f64 = 14.0;

/// Write the styled room listing workbook: one right-to-left sheet, one
/// labeled block per room. Deterministic for any room count; zero rooms
/// produce the bare sheet.
pub fn write_workbook(roster: &Roster, rooms: &[Room], out_path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_right_to_left(true);

    let fmt_title = Format::new().set_bold().set_font_size(TITLE_FONT_SIZE);
    let fmt_header = Format::new()
        .set_bold()
        .set_background_color(HEADER_FILL)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_text_wrap();
    let fmt_cell = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Right);

    let mut row: u32 = 0;
    for room in rooms {
        row = write_room_block(worksheet, roster, room, row, &fmt_title, &fmt_header, &fmt_cell)?;
    }

    for idx in 0..roster.columns.len() {
        let width = if roster.name_column == Some(idx) {
            NAME_COLUMN_WIDTH
        } else {
            DEFAULT_COLUMN_WIDTH
        };
        worksheet.set_column_width(col_num(idx)?, width)?;
    }

    workbook
        .save(out_path)
        .with_context(|| format!("failed to write workbook {}", out_path.to_string_lossy()))?;
    Ok(())
}

/// Write one room's title, header row and member rows starting at
/// `start_row`; returns the starting row of the next block.
fn write_room_block(
    worksheet: &mut Worksheet,
    roster: &Roster,
    room: &Room,
    start_row: u32,
    fmt_title: &Format,
    fmt_header: &Format,
    fmt_cell: &Format,
) -> anyhow::Result<u32> {
    worksheet.write_string_with_format(start_row, 0, &format!("Room: {}", room.name), fmt_title)?;

    let header_row = start_row + 1;
    for (idx, label) in roster.columns.iter().enumerate() {
        worksheet.write_string_with_format(header_row, col_num(idx)?, label, fmt_header)?;
    }

    let members = &roster.rows[room.start..room.start + room.size];
    for (offset, member) in members.iter().enumerate() {
        let sheet_row = header_row + 1 + offset as u32;
        for (idx, value) in member.iter().enumerate() {
            write_cell(worksheet, sheet_row, col_num(idx)?, value, fmt_cell)?;
        }
    }

    Ok(header_row + room.size as u32 + 1 + ROOM_GAP_ROWS)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> anyhow::Result<()> {
    match value {
        Value::Null => {
            worksheet.write_blank(row, col, format)?;
        }
        Value::Number(n) => {
            // serde_json numbers always render as f64 cells.
            let v = n.as_f64().unwrap_or(0.0);
            worksheet.write_number_with_format(row, col, v, format)?;
        }
        Value::String(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        other => {
            worksheet.write_string_with_format(row, col, &other.to_string(), format)?;
        }
    }
    Ok(())
}

fn col_num(idx: usize) -> anyhow::Result<u16> {
    u16::try_from(idx).with_context(|| format!("column index overflow: {idx}"))
}
