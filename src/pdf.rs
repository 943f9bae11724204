use std::io::BufWriter;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use crate::error::{NetMeterError, Result};
use crate::fmt::{opt_kwh, opt_money, statement_date};
use crate::models::ReportRow;
use crate::settings::Settings;
use crate::statement::Statement;

// A4 portrait (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_RIGHT: f32 = 15.0;
const HEADER_H: f32 = 32.0;
const ROW_H: f32 = 6.0;
const FONT_SIZE: f32 = 9.0;
const SMALL_SIZE: f32 = 7.0;
const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const SIDE_X: f32 = 145.0;
const SIDE_W: f32 = PAGE_W - MARGIN_RIGHT - SIDE_X;
const CHART_W: f32 = 87.0;
const CHART_H: f32 = 70.0;

const TABLE_COLS: [f32; 4] = [26.0, 36.0, 32.0, 28.0];
const TABLE_HEADERS: [[&str; 2]; 4] = [
    ["Billing Period", "Ending"],
    ["Net Generation or", "Net Consumption"],
    ["Annual Net", "Surplus (To-Date)"],
    ["Net Surplus", "Cash Value (1)"],
];

const FOOTNOTE: &str = "(1) Net Surplus Cash Value is calculated based on the customer's \
Annual Net Surplus since their previous settlement date, valued at the Net Surplus \
Compensation Rate. Net Surplus Cash Value will be credited to customers at their annual \
settlement month, and the Annual Net Surplus will then be reset to zero (allow 2 billing \
periods for credit to appear).";

#[derive(Clone, Copy)]
struct Rgb8(u8, u8, u8);

const BLACK: Rgb8 = Rgb8(0, 0, 0);
const GREY: Rgb8 = Rgb8(75, 85, 99);
const LIGHT_GREY: Rgb8 = Rgb8(209, 213, 219);
const PALE_GREEN: Rgb8 = Rgb8(226, 239, 217);
const DARK_GREEN: Rgb8 = Rgb8(22, 101, 52);
const TEXT_GREEN: Rgb8 = Rgb8(22, 163, 74);
const TEXT_BLUE: Rgb8 = Rgb8(37, 99, 235);
const BAR_GREEN: Rgb8 = Rgb8(74, 222, 128);
const BAR_BLUE: Rgb8 = Rgb8(59, 130, 246);
const BAR_MINT: Rgb8 = Rgb8(187, 247, 208);
const RED: Rgb8 = Rgb8(239, 68, 68);

impl Rgb8 {
    fn color(self) -> Color {
        Color::Rgb(Rgb::new(
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
            None,
        ))
    }
}

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.len() as f32 * size * 0.18
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    /// Distance from the top edge; printpdf measures from the bottom.
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| NetMeterError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| NetMeterError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: 0.0,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn text_at(&self, s: &str, x: f32, top: f32, size: f32, bold: bool, color: Rgb8) {
        let font = if bold { &self.font_bold } else { &self.font };
        let layer = self.layer();
        layer.set_fill_color(color.color());
        layer.use_text(s, size, Mm(x), Mm(PAGE_H - top), font);
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        self.text_at(s, x, self.y, size, bold, BLACK);
    }

    fn text_right(&self, s: &str, right: f32, top: f32, size: f32, bold: bool) {
        let tw = approx_text_width(s, size);
        self.text_at(s, right - tw, top, size, bold, BLACK);
    }

    fn text_centered(&self, s: &str, x: f32, width: f32, top: f32, size: f32, bold: bool, color: Rgb8) {
        let tw = approx_text_width(s, size);
        self.text_at(s, x + (width - tw) / 2.0, top, size, bold, color);
    }

    fn line(&self, x1: f32, top1: f32, x2: f32, top2: f32, thickness: f32, color: Rgb8) {
        let layer = self.layer();
        layer.set_outline_thickness(thickness);
        layer.set_outline_color(color.color());
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(PAGE_H - top1)), false),
                (Point::new(Mm(x2), Mm(PAGE_H - top2)), false),
            ],
            is_closed: false,
        });
    }

    fn hline(&self, x1: f32, x2: f32, top: f32) {
        self.line(x1, top, x2, top, 0.5, BLACK);
    }

    fn rect(&self, x: f32, top: f32, w: f32, h: f32, fill: Option<Rgb8>, stroke: Option<Rgb8>) {
        let mode = match (fill, stroke) {
            (Some(_), Some(_)) => PaintMode::FillStroke,
            (Some(_), None) => PaintMode::Fill,
            (None, Some(_)) => PaintMode::Stroke,
            (None, None) => return,
        };
        let layer = self.layer();
        if let Some(c) = fill {
            layer.set_fill_color(c.color());
        }
        if let Some(c) = stroke {
            layer.set_outline_color(c.color());
            layer.set_outline_thickness(0.5);
        }
        let (bottom, top) = (PAGE_H - top - h, PAGE_H - top);
        layer.add_polygon(Polygon {
            rings: vec![vec![
                (Point::new(Mm(x), Mm(bottom)), false),
                (Point::new(Mm(x + w), Mm(bottom)), false),
                (Point::new(Mm(x + w), Mm(top)), false),
                (Point::new(Mm(x), Mm(top)), false),
            ]],
            mode,
            winding_order: WindingOrder::NonZero,
        });
    }

    /// Writes wrapped text starting at the cursor and advances it.
    fn paragraph(&mut self, s: &str, x: f32, width_chars: usize, size: f32, line_h: f32, color: Rgb8) {
        for line in textwrap::wrap(s, width_chars) {
            self.text_at(&line, x, self.y, size, false, color);
            self.y += line_h;
        }
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| NetMeterError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| NetMeterError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Statement sections
// ---------------------------------------------------------------------------

fn header_band(pdf: &mut PdfWriter, settings: &Settings) {
    pdf.rect(0.0, 0.0, PAGE_W, HEADER_H, Some(PALE_GREEN), None);
    pdf.line(0.0, HEADER_H, PAGE_W, HEADER_H, 1.5, DARK_GREEN);
    pdf.text_at(&settings.utility_name, MARGIN_LEFT, 19.0, 11.0, true, DARK_GREEN);
    pdf.text_right("Electric Net Metering Statement", PAGE_W - MARGIN_RIGHT, 20.0, TITLE_SIZE, false);
    pdf.y = HEADER_H + 10.0;
}

fn address_block(pdf: &mut PdfWriter, statement: &Statement) {
    let top = pdf.y;
    let mut left_y = top;
    for line in statement.mailing_lines() {
        pdf.text_at(&line, MARGIN_LEFT, left_y, FONT_SIZE + 1.0, false, BLACK);
        left_y += 5.0;
    }

    let label_x = 120.0;
    let value_x = 152.0;
    let mut right_y = top;
    let date = statement_date(statement.statement_date);
    let account = &statement.account;
    for (label, value) in [
        ("Statement Date:", date.as_str()),
        ("Account #:", account.account_id.as_str()),
    ] {
        pdf.text_at(label, label_x, right_y, FONT_SIZE, true, BLACK);
        pdf.text_at(value, value_x, right_y, FONT_SIZE, false, BLACK);
        right_y += 5.0;
    }
    pdf.text_at("Service Address:", label_x, right_y, FONT_SIZE, true, BLACK);
    for line in textwrap::wrap(&account.service_address, 24) {
        pdf.text_at(&line, value_x, right_y, FONT_SIZE, false, BLACK);
        right_y += 5.0;
    }
    pdf.y = left_y.max(right_y).max(top + 15.0) + 4.0;
}

fn explanation(pdf: &mut PdfWriter, settings: &Settings) {
    let text = format!(
        "This statement shows your net electricity consumption or generation for the previous \
         twelve months, as well as your Net Surplus Cash Value under election A. For more \
         information on the {name}' Net Energy Metering policies, please visit {url}. If you \
         should have any questions about your Net Metering Credits or Balance, please either \
         call Customer Service at {phone} or send an email to {email}.",
        name = settings.utility_name,
        url = settings.info_url,
        phone = settings.phone,
        email = settings.email,
    );
    pdf.paragraph(&text, MARGIN_LEFT, 125, SMALL_SIZE, 3.4, GREY);
    pdf.y += 6.0;
}

fn usage_table(pdf: &mut PdfWriter, statement: &Statement) {
    let x0 = MARGIN_LEFT;
    let width: f32 = TABLE_COLS.iter().sum();
    let top = pdf.y;
    let header_h = ROW_H * 2.0;

    pdf.rect(x0, top, width, header_h, Some(PALE_GREEN), Some(BLACK));
    let mut x = x0;
    for (col_w, lines) in TABLE_COLS.iter().zip(TABLE_HEADERS.iter()) {
        pdf.text_centered(lines[0], x, *col_w, top + 4.5, SMALL_SIZE + 1.0, true, BLACK);
        pdf.text_centered(lines[1], x, *col_w, top + 9.0, SMALL_SIZE + 1.0, true, BLACK);
        x += col_w;
    }

    let mut y = top + header_h;
    for (i, row) in statement.rows.iter().enumerate() {
        let band = if i % 2 == 0 { None } else { Some(Rgb8(249, 250, 251)) };
        pdf.rect(x0, y, width, ROW_H, band, Some(BLACK));
        let bold = statement.is_settlement_row(row);
        let net_color = match row.net_gen_consumption {
            Some(v) if v < 0.0 => TEXT_GREEN,
            Some(_) => TEXT_BLUE,
            None => BLACK,
        };
        let cells = [
            (row.month_label.clone(), BLACK),
            (opt_kwh(row.net_gen_consumption), net_color),
            (opt_kwh(row.annual_net_surplus), BLACK),
            (opt_money(row.net_surplus_cash_value), BLACK),
        ];
        let mut x = x0;
        for (col_w, (value, color)) in TABLE_COLS.iter().zip(cells.iter()) {
            pdf.text_centered(value, x, *col_w, y + 4.2, FONT_SIZE, bold, *color);
            x += col_w;
        }
        y += ROW_H;
    }

    // column rules
    let mut x = x0;
    for col_w in &TABLE_COLS[..TABLE_COLS.len() - 1] {
        x += col_w;
        pdf.line(x, top, x, y, 0.5, BLACK);
    }
    pdf.y = y;
}

fn side_column(pdf: &mut PdfWriter, statement: &Statement, settings: &Settings, top: f32) -> f32 {
    let mut y = top;
    for line in textwrap::wrap(FOOTNOTE, 52) {
        pdf.text_at(&line, SIDE_X, y + 2.0, 5.5, false, GREY);
        y += 2.6;
    }
    y += 4.0;

    // compensation rate box
    let half = SIDE_W / 2.0;
    pdf.rect(SIDE_X, y, SIDE_W, 5.0, Some(PALE_GREEN), Some(BLACK));
    pdf.text_centered("Net Surplus Electricity", SIDE_X, SIDE_W, y + 3.6, SMALL_SIZE, true, BLACK);
    y += 5.0;
    pdf.rect(SIDE_X, y, SIDE_W, 5.0, Some(PALE_GREEN), Some(BLACK));
    pdf.text_centered("Fiscal Year", SIDE_X, half, y + 3.6, SMALL_SIZE, true, BLACK);
    pdf.text_centered("Compensation Rate", SIDE_X + half, half, y + 3.6, SMALL_SIZE, true, BLACK);
    pdf.line(SIDE_X + half, y, SIDE_X + half, y + 5.0, 0.5, BLACK);
    y += 5.0;
    for rate in &settings.compensation_rates {
        pdf.rect(SIDE_X, y, SIDE_W, 5.0, Some(PALE_GREEN), Some(BLACK));
        pdf.text_centered(&rate.fiscal_year.to_string(), SIDE_X, half, y + 3.6, SMALL_SIZE, false, BLACK);
        let value = format!("{:.4} $/kWh", rate.rate);
        pdf.text_centered(&value, SIDE_X + half, half, y + 3.6, SMALL_SIZE, false, BLACK);
        pdf.line(SIDE_X + half, y, SIDE_X + half, y + 5.0, 0.5, BLACK);
        y += 5.0;
    }
    y += 6.0;

    // settlement callout
    let callout = statement.settlement_callout();
    let lines = textwrap::wrap(&callout, 40);
    let box_h = lines.len() as f32 * 3.4 + 3.0;
    pdf.rect(SIDE_X, y, SIDE_W, box_h, None, Some(RED));
    pdf.line(SIDE_X - 3.0, y + box_h / 2.0, SIDE_X, y + box_h / 2.0, 0.5, RED);
    let mut text_y = y + 3.8;
    for line in &lines {
        pdf.text_at(line, SIDE_X + 2.0, text_y, SMALL_SIZE, false, BLACK);
        text_y += 3.4;
    }
    y + box_h
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Value range for a bar chart, always spanning zero and never empty.
fn chart_bounds(values: &[f64]) -> (f64, f64) {
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    let min = values.iter().cloned().fold(0.0_f64, f64::min);
    if max - min < f64::EPSILON {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

struct BarStyle {
    fill: fn(f64) -> Rgb8,
    stroke: Option<Rgb8>,
    axis_label: fn(f64) -> String,
}

fn bar_chart(pdf: &PdfWriter, x: f32, top: f32, title: &str, rows: &[ReportRow], values: &[f64], style: &BarStyle) {
    pdf.rect(x, top, CHART_W, CHART_H, None, Some(DARK_GREEN));
    pdf.text_centered(title, x, CHART_W, top + 6.0, FONT_SIZE, true, BLACK);

    let plot_x = x + 16.0;
    let plot_w = CHART_W - 20.0;
    let plot_top = top + 11.0;
    let plot_h = CHART_H - 22.0;

    let (min, max) = chart_bounds(values);
    let scale = plot_h / (max - min) as f32;
    let baseline = plot_top + max as f32 * scale;

    for (v, at) in [(max, plot_top), (min, plot_top + plot_h)] {
        pdf.line(plot_x, at, plot_x + plot_w, at, 0.2, LIGHT_GREY);
        pdf.text_right(&(style.axis_label)(v), plot_x - 1.5, at + 1.0, 5.5, false);
    }
    pdf.text_right(&(style.axis_label)(0.0), plot_x - 1.5, baseline + 1.0, 5.5, false);

    let slot = plot_w / values.len().max(1) as f32;
    for (i, (value, row)) in values.iter().zip(rows.iter()).enumerate() {
        let bar_x = plot_x + slot * i as f32 + slot * 0.2;
        let height = value.abs() as f32 * scale;
        if height > 0.0 {
            let bar_top = if *value >= 0.0 { baseline - height } else { baseline };
            pdf.rect(bar_x, bar_top, slot * 0.6, height, Some((style.fill)(*value)), style.stroke);
        }
        pdf.text_centered(&row.month_label, plot_x + slot * i as f32, slot, plot_top + plot_h + 5.0, 4.5, false, GREY);
    }
    pdf.line(plot_x, baseline, plot_x + plot_w, baseline, 0.6, BLACK);
}

fn charts(pdf: &mut PdfWriter, statement: &Statement) {
    let top = pdf.y;
    let net: Vec<f64> = statement
        .rows
        .iter()
        .map(|r| r.net_gen_consumption.unwrap_or(0.0))
        .collect();
    let cash: Vec<f64> = statement
        .rows
        .iter()
        .map(|r| r.net_surplus_cash_value.unwrap_or(0.0))
        .collect();

    let net_style = BarStyle {
        fill: |v| if v < 0.0 { BAR_GREEN } else { BAR_BLUE },
        stroke: None,
        axis_label: |v| format!("{v:.0}"),
    };
    let cash_style = BarStyle {
        fill: |_| BAR_MINT,
        stroke: Some(DARK_GREEN),
        axis_label: |v| format!("${v:.0}"),
    };
    bar_chart(pdf, MARGIN_LEFT, top, "Net Generation or Net Consumption", &statement.rows, &net, &net_style);
    bar_chart(
        pdf,
        PAGE_W - MARGIN_RIGHT - CHART_W,
        top,
        "Net Surplus Cash Value",
        &statement.rows,
        &cash,
        &cash_style,
    );
    pdf.y = top + CHART_H;
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// Lays out one statement page and returns the finished PDF bytes.
pub fn render_statement(statement: &Statement, settings: &Settings) -> Result<Vec<u8>> {
    let title = format!(
        "Net Metering Statement {} {}",
        statement.account.account_id, statement.month
    );
    let mut pdf = PdfWriter::new(&title)?;

    header_band(&mut pdf, settings);
    address_block(&mut pdf, statement);
    explanation(&mut pdf, settings);

    let heading = format!(
        "Election A (Settlement Month = {})",
        statement.account.settlement_month
    );
    pdf.text(&heading, MARGIN_LEFT, HEADING_SIZE, false);
    pdf.y += 5.0;
    pdf.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT, pdf.y);
    pdf.y += 4.0;

    let content_top = pdf.y;
    usage_table(&mut pdf, statement);
    let side_bottom = side_column(&mut pdf, statement, settings, content_top);
    pdf.y = pdf.y.max(side_bottom) + 8.0;

    charts(&mut pdf, statement);
    pdf.to_bytes()
}
