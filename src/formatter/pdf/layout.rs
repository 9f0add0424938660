use crate::formatter::{format_currency, format_miles, format_rate, format_uk_date};
use crate::models::Bill;

/// A4 纵向 (mm)
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_X: f32 = 14.0;
const TOP_MARGIN: f32 = 20.0;
/// 正文不得越过页脚区域
const CONTENT_BOTTOM: f32 = PAGE_HEIGHT - 20.0;
const FOOTER_Y: f32 = PAGE_HEIGHT - 10.0;
const PT_TO_MM: f32 = 0.352_778;
/// Helvetica 平均字宽约 0.5em
const AVG_CHAR_EM: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

pub const GOLD: Rgb8 = Rgb8(212, 175, 55);
pub const WHITE: Rgb8 = Rgb8(255, 255, 255);
pub const PRIMARY_TEXT: Rgb8 = Rgb8(17, 24, 39);
pub const SECONDARY_TEXT: Rgb8 = Rgb8(107, 114, 128);
pub const LABEL_TEXT: Rgb8 = Rgb8(31, 41, 55);
pub const DISABLED_TEXT: Rgb8 = Rgb8(156, 163, 175);
pub const STRIPE: Rgb8 = Rgb8(249, 250, 251);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// 绘制指令, 坐标原点在页面左上角, y 向下 (mm)
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` 为文字基线
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
        color: Rgb8,
    },
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb8,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Fill { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
    /// 排版失败、改用纯文本的表格
    pub fallbacks: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("row {row} has {found} cells, expected {expected}")]
    ColumnMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("table needs {required:.1}mm but only {available:.1}mm is printable")]
    TooWide { required: f32, available: f32 },
}

/// 估算文字宽度 (mm)
pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_CHAR_EM
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM
}

/// 分页游标
#[derive(Debug, Clone)]
struct Pager {
    pages: Vec<PageLayout>,
    y: f32,
}

impl Pager {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: TOP_MARGIN,
        }
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.pages.push(PageLayout::default());
        }
        let last = self.pages.len() - 1;
        self.pages[last].ops.push(op);
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = TOP_MARGIN;
    }

    /// 剩余空间不足时换页, 返回是否换了页
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y + height > CONTENT_BOTTOM {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, weight: FontWeight, color: Rgb8) {
        self.push(DrawOp::Text {
            text: text.into(),
            x,
            y,
            size,
            weight,
            color,
        });
    }

    /// 在当前游标处写一行并下移
    fn line(&mut self, text: impl Into<String>, x: f32, size: f32, advance: f32) {
        self.ensure_space(advance);
        self.y += advance;
        let y = self.y;
        self.text(text, x, y, size, FontWeight::Regular, PRIMARY_TEXT);
    }
}

#[derive(Debug, Clone, Copy)]
struct RowStyle {
    fill: Option<Rgb8>,
    color: Rgb8,
    bold: bool,
}

#[derive(Debug, Clone, Copy)]
struct TableStyle {
    font_size: f32,
    padding: f32,
    /// 拉伸到可打印宽度
    stretch: bool,
    head: RowStyle,
    body: RowStyle,
    stripe: Option<Rgb8>,
    foot: RowStyle,
    bold_first_column: Option<Rgb8>,
}

struct Table {
    head: Option<Vec<String>>,
    body: Vec<Vec<String>>,
    foot: Option<Vec<String>>,
    style: TableStyle,
}

impl Table {
    fn rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.head
            .iter()
            .chain(self.body.iter())
            .chain(self.foot.iter())
    }

    /// 列宽: 先取自然宽度, 超出可打印宽度时收窄最宽的列 (单元格换行)
    fn column_widths(&self) -> Result<Vec<f32>, LayoutError> {
        let expected = self.rows().next().map(|r| r.len()).unwrap_or(0);
        let mut widths = vec![0.0f32; expected];
        let mut minimums = vec![0.0f32; expected];

        for (row_idx, row) in self.rows().enumerate() {
            if row.len() != expected {
                return Err(LayoutError::ColumnMismatch {
                    row: row_idx,
                    expected,
                    found: row.len(),
                });
            }
            for (col, cell) in row.iter().enumerate() {
                let w = text_width(cell, self.style.font_size) + 2.0 * self.style.padding;
                widths[col] = widths[col].max(w);
                minimums[col] = minimums[col].max(min_cell_width(cell, &self.style));
            }
        }

        let available = PAGE_WIDTH - 2.0 * MARGIN_X;
        shrink_to_fit(&mut widths, &minimums, available);

        let required: f32 = widths.iter().sum();
        if required > available + WIDTH_TOLERANCE {
            return Err(LayoutError::TooWide {
                required,
                available,
            });
        }

        if self.style.stretch && expected > 0 && required < available {
            let extra = (available - required) / expected as f32;
            widths.iter_mut().for_each(|w| *w += extra);
        }
        Ok(widths)
    }
}

const WIDTH_TOLERANCE: f32 = 0.01;
/// 单词超过该字符数时允许在词内断行
const MAX_UNBROKEN_CHARS: usize = 16;
const LINE_SPACING: f32 = 1.2;

fn char_width(size: f32) -> f32 {
    size * PT_TO_MM * AVG_CHAR_EM
}

/// 单元格可收窄到的最小宽度: 最长单词 (上限 MAX_UNBROKEN_CHARS 个字符)
fn min_cell_width(cell: &str, style: &TableStyle) -> f32 {
    let longest = cell
        .split_whitespace()
        .map(|w| w.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_UNBROKEN_CHARS);
    longest as f32 * char_width(style.font_size) + 2.0 * style.padding
}

/// 逐步压低最宽的可收窄列, 直到总宽度不超过 `available` 或所有列都到了下限
fn shrink_to_fit(widths: &mut [f32], minimums: &[f32], available: f32) {
    for _ in 0..widths.len() * 4 {
        let excess = widths.iter().sum::<f32>() - available;
        if excess <= WIDTH_TOLERANCE {
            return;
        }

        let shrinkable: Vec<usize> = (0..widths.len())
            .filter(|&c| widths[c] > minimums[c] + WIDTH_TOLERANCE)
            .collect();
        let Some(widest) = shrinkable.iter().map(|&c| widths[c]).reduce(f32::max) else {
            return;
        };
        let tied: Vec<usize> = shrinkable
            .iter()
            .copied()
            .filter(|&c| widths[c] >= widest - WIDTH_TOLERANCE)
            .collect();
        let next = shrinkable
            .iter()
            .map(|&c| widths[c])
            .filter(|&w| w < widest - WIDTH_TOLERANCE)
            .fold(0.0f32, f32::max);

        let target = widest - excess / tied.len() as f32;
        for c in tied {
            widths[c] = target.max(next).max(minimums[c]);
        }
    }
}

/// 按列宽折行, 超长单词按字符切分
fn wrap_cell(text: &str, width: f32, style: &TableStyle) -> Vec<String> {
    let max_chars = ((width - 2.0 * style.padding) / char_width(style.font_size) + 0.001)
        .floor()
        .max(1.0) as usize;

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(chars.drain(..max_chars).collect());
        }
        if chars.is_empty() {
            continue;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + chars.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(chars);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn block_height(lines: usize, style: &TableStyle) -> f32 {
    let lh = line_height(style.font_size);
    lh + lines.saturating_sub(1) as f32 * lh * LINE_SPACING + 2.0 * style.padding
}

fn wrap_row(cells: &[String], widths: &[f32], style: &TableStyle) -> Vec<Vec<String>> {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| wrap_cell(cell, *width, style))
        .collect()
}

fn row_height(cells: &[String], widths: &[f32], style: &TableStyle) -> f32 {
    let lines = wrap_row(cells, widths, style)
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(1);
    block_height(lines, style)
}

fn draw_row(pager: &mut Pager, cells: &[String], widths: &[f32], style: &TableStyle, row: RowStyle) {
    let wrapped = wrap_row(cells, widths, style);
    let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
    let height = block_height(lines, style);
    let top = pager.y;

    if let Some(fill) = row.fill {
        pager.push(DrawOp::Fill {
            x: MARGIN_X,
            y: top,
            width: widths.iter().sum(),
            height,
            color: fill,
        });
    }

    let lh = line_height(style.font_size);
    let baseline = top + style.padding + lh * 0.8;
    let mut x = MARGIN_X;
    for (col, (cell_lines, width)) in wrapped.iter().zip(widths).enumerate() {
        let (weight, color) = match (col, style.bold_first_column) {
            (0, Some(color)) => (FontWeight::Bold, color),
            _ if row.bold => (FontWeight::Bold, row.color),
            _ => (FontWeight::Regular, row.color),
        };
        for (idx, line) in cell_lines.iter().enumerate() {
            if !line.is_empty() {
                let y = baseline + idx as f32 * lh * LINE_SPACING;
                pager.text(line.clone(), x + style.padding, y, style.font_size, weight, color);
            }
        }
        x += width;
    }

    pager.y = top + height;
}

/// 表格排版, 换页时重复表头
fn layout_table(pager: &mut Pager, table: &Table) -> Result<(), LayoutError> {
    let widths = table.column_widths()?;
    if widths.is_empty() {
        return Ok(());
    }
    let style = &table.style;
    let head_height = table
        .head
        .as_ref()
        .map(|head| row_height(head, &widths, style))
        .unwrap_or(0.0);

    // 表头至少要和第一行在同一页
    let first_row = table
        .body
        .first()
        .map(|row| row_height(row, &widths, style))
        .unwrap_or(0.0);
    pager.ensure_space(head_height + first_row);
    if let Some(head) = &table.head {
        draw_row(pager, head, &widths, style, style.head);
    }

    for (idx, row) in table.body.iter().enumerate() {
        if pager.ensure_space(row_height(row, &widths, style)) {
            if let Some(head) = &table.head {
                draw_row(pager, head, &widths, style, style.head);
            }
        }
        let mut row_style = style.body;
        if idx % 2 == 1 {
            row_style.fill = style.stripe.or(row_style.fill);
        }
        draw_row(pager, row, &widths, style, row_style);
    }

    if let Some(foot) = &table.foot {
        pager.ensure_space(row_height(foot, &widths, style));
        draw_row(pager, foot, &widths, style, style.foot);
    }
    Ok(())
}

/// 尝试表格排版, 失败时用纯文本回退
fn place_table(
    pager: &mut Pager,
    table: &Table,
    name: &'static str,
    fallbacks: &mut Vec<&'static str>,
    fallback: impl FnOnce(&mut Pager),
) {
    let mut attempt = pager.clone();
    match layout_table(&mut attempt, table) {
        Ok(()) => *pager = attempt,
        Err(e) => {
            tracing::warn!("Error creating {} table: {}, using text layout", name, e);
            fallbacks.push(name);
            fallback(pager);
        }
    }
}

/// 账单 PDF 排版
pub fn layout_bill(bill: &Bill) -> DocumentLayout {
    let mut pager = Pager::new();
    let mut fallbacks = Vec::new();

    pager.text("Vehicle Usage Bill", MARGIN_X, 22.0, 20.0, FontWeight::Bold, PRIMARY_TEXT);
    pager.text(bill.customer_name.clone(), MARGIN_X, 30.0, 12.0, FontWeight::Regular, SECONDARY_TEXT);
    pager.text("Bill Overview", MARGIN_X, 42.0, 14.0, FontWeight::Bold, PRIMARY_TEXT);
    pager.y = 46.0;

    let summary_rows = vec![
        vec![
            "Billing Period:".to_string(),
            format!(
                "{} to {}",
                format_uk_date(&bill.billing_period_start),
                format_uk_date(&bill.billing_period_end)
            ),
        ],
        vec!["Total Miles:".to_string(), format_miles(&bill.total_miles)],
        vec!["Cost Per Mile:".to_string(), format_rate(&bill.cost_per_mile)],
        vec!["Total Cost:".to_string(), format_currency(&bill.total_cost)],
    ];
    let summary = Table {
        head: None,
        body: summary_rows.clone(),
        foot: None,
        style: TableStyle {
            font_size: 12.0,
            padding: 2.0,
            stretch: false,
            head: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
            body: RowStyle { fill: None, color: PRIMARY_TEXT, bold: false },
            stripe: None,
            foot: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
            bold_first_column: Some(LABEL_TEXT),
        },
    };
    place_table(&mut pager, &summary, "summary", &mut fallbacks, |pager| {
        for row in &summary_rows {
            pager.line(row.join(" "), MARGIN_X, 12.0, 8.0);
        }
    });

    // 车辆明细
    pager.ensure_space(40.0);
    pager.y += 15.0;
    let heading_y = pager.y;
    pager.text("Vehicle Details", MARGIN_X, heading_y, 14.0, FontWeight::Bold, PRIMARY_TEXT);
    pager.y += 5.0;

    let vehicles = Table {
        head: Some(
            ["Registration", "Make", "Model", "Start Miles", "End Miles", "Miles Driven", "Cost"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        body: bill
            .vehicles
            .iter()
            .map(|v| {
                vec![
                    v.license_plate.clone(),
                    v.make.clone(),
                    v.model.clone(),
                    format_miles(&v.start_odometer_miles),
                    format_miles(&v.end_odometer_miles),
                    format_miles(&v.miles_travelled),
                    format_currency(&v.cost),
                ]
            })
            .collect(),
        foot: Some(vec![
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            "Total:".to_string(),
            format_miles(&bill.total_miles),
            format_currency(&bill.total_cost),
        ]),
        style: TableStyle {
            font_size: 10.0,
            padding: 2.0,
            stretch: true,
            head: RowStyle { fill: Some(GOLD), color: WHITE, bold: true },
            body: RowStyle { fill: None, color: PRIMARY_TEXT, bold: false },
            stripe: Some(STRIPE),
            foot: RowStyle { fill: Some(STRIPE), color: PRIMARY_TEXT, bold: true },
            bold_first_column: None,
        },
    };
    place_table(&mut pager, &vehicles, "vehicle", &mut fallbacks, |pager| {
        pager.line("Vehicle Details:", MARGIN_X, 12.0, 8.0);
        for v in &bill.vehicles {
            pager.line(
                format!("{} {} ({})", v.make, v.model, v.license_plate),
                20.0,
                12.0,
                10.0,
            );
            pager.line(
                format!(
                    "Miles: {} ({})",
                    format_miles(&v.miles_travelled),
                    format_currency(&v.cost)
                ),
                25.0,
                12.0,
                8.0,
            );
        }
        pager.line(format!("Total Miles: {}", format_miles(&bill.total_miles)), MARGIN_X, 12.0, 12.0);
        pager.line(format!("Total Cost: {}", format_currency(&bill.total_cost)), MARGIN_X, 12.0, 8.0);
    });

    // 每页页脚
    let generated = format_uk_date(&bill.generated_at);
    let total = pager.pages.len();
    for (idx, page) in pager.pages.iter_mut().enumerate() {
        page.ops.push(DrawOp::Text {
            text: format!("Generated on: {} - Page {} of {}", generated, idx + 1, total),
            x: MARGIN_X,
            y: FOOTER_Y,
            size: 10.0,
            weight: FontWeight::Regular,
            color: DISABLED_TEXT,
        });
    }

    DocumentLayout {
        pages: pager.pages,
        fallbacks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::test_support::{line, sample_bill};

    fn all_texts(layout: &DocumentLayout) -> Vec<String> {
        layout
            .pages
            .iter()
            .flat_map(|p| p.texts().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn single_page_bill_has_tables_and_footer() {
        let layout = layout_bill(&sample_bill());
        let texts = all_texts(&layout);

        assert_eq!(layout.pages.len(), 1);
        assert!(layout.fallbacks.is_empty());
        assert!(texts.contains(&"Vehicle Usage Bill".to_string()));
        assert!(texts.contains(&"Bill Overview".to_string()));
        assert!(texts.contains(&"£0.207".to_string()));
        assert!(texts.contains(&"Registration".to_string()));
        assert!(texts.contains(&"Total:".to_string()));
        assert!(texts.contains(&"Generated on: 25/04/2023 14:30 - Page 1 of 1".to_string()));
    }

    #[test]
    fn header_row_is_gold_filled() {
        let layout = layout_bill(&sample_bill());
        let gold_fills = layout.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Fill { color, .. } if *color == GOLD))
            .count();
        assert_eq!(gold_fills, 1);
    }

    #[test]
    fn long_fleet_spans_pages_with_footer_on_each() {
        let mut bill = sample_bill();
        let template = bill.vehicles[0].clone();
        bill.vehicles = (0..80)
            .map(|i| {
                let mut v = template.clone();
                v.license_plate = format!("CAR {}", i);
                v
            })
            .collect();

        let layout = layout_bill(&bill);
        let pages = layout.pages.len();
        assert!(pages > 1);
        for (idx, page) in layout.pages.iter().enumerate() {
            let footer = format!("Generated on: 25/04/2023 14:30 - Page {} of {}", idx + 1, pages);
            assert!(page.texts().any(|t| t == footer));
            // 续页重复表头
            assert!(page.texts().any(|t| t == "Registration"));
        }
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Text { y, text, .. } = op {
                    if !text.starts_with("Generated on") {
                        assert!(*y <= CONTENT_BOTTOM, "{} overflows at {}", text, y);
                    }
                }
            }
        }
    }

    #[test]
    fn long_names_wrap_inside_the_table() {
        let mut bill = sample_bill();
        bill.vehicles[0].make = "Mercedes-Benz".to_string();
        bill.vehicles[0].model = "Sprinter 316 CDI LWB High Roof".to_string();

        let layout = layout_bill(&bill);
        let texts = all_texts(&layout);

        assert!(layout.fallbacks.is_empty());
        assert_eq!(layout.pages.len(), 1);
        assert!(texts.contains(&"Registration".to_string()));
        assert!(texts.contains(&"Mercedes-Benz".to_string()));
        assert!(texts.contains(&"Sprinter 316 CDI LWB".to_string()));
        assert!(texts.contains(&"High Roof".to_string()));
        assert!(!texts.contains(&"Vehicle Details:".to_string()));

        // 换行后表格仍在可打印宽度内
        for op in &layout.pages[0].ops {
            if let DrawOp::Fill { x, width, .. } = op {
                assert!(x + width <= PAGE_WIDTH - MARGIN_X + 0.1);
            }
        }
    }

    #[test]
    fn wrapping_splits_on_words_then_characters() {
        let style = TableStyle {
            font_size: 10.0,
            padding: 2.0,
            stretch: false,
            head: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
            body: RowStyle { fill: None, color: PRIMARY_TEXT, bold: false },
            stripe: None,
            foot: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
            bold_first_column: None,
        };
        // 10 个字符宽
        let width = 10.0 * char_width(10.0) + 4.0;

        assert_eq!(wrap_cell("High Roof", width, &style), vec!["High Roof"]);
        assert_eq!(
            wrap_cell("Sprinter 316 CDI", width, &style),
            vec!["Sprinter", "316 CDI"]
        );
        assert_eq!(
            wrap_cell("ABCDEFGHIJKLMNO", width, &style),
            vec!["ABCDEFGHIJ", "KLMNO"]
        );
        assert_eq!(wrap_cell("", width, &style), vec![""]);
    }

    #[test]
    fn unfittable_table_falls_back_to_text() {
        let mut bill = sample_bill();
        bill.vehicles.push(line(
            "REGISTRATIONXXXXXXXX",
            "VIN-LONG",
            "COACHBUILDERSXXXXXXX",
            "LIMOUSINEXXXXXXXXXXX",
            "1234567890123456.00",
            "1234567890123457.00",
            "1234567890123456.00",
            "1234567890123456.00",
        ));

        let layout = layout_bill(&bill);
        let texts = all_texts(&layout);

        assert_eq!(layout.fallbacks, vec!["vehicle"]);
        assert!(!texts.contains(&"Registration".to_string()));
        assert!(texts.contains(&"Vehicle Details:".to_string()));
        assert!(texts.contains(&"Toyota Corolla (CBDH 789)".to_string()));
        assert!(texts.contains(&"Miles: 700.00 (£144.90)".to_string()));
        assert!(texts.contains(&"Total Cost: £258.75".to_string()));
        assert!(texts.iter().any(|t| t.starts_with("Generated on:")));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let table = Table {
            head: Some(vec!["a".to_string(), "b".to_string()]),
            body: vec![vec!["only one".to_string()]],
            foot: None,
            style: TableStyle {
                font_size: 10.0,
                padding: 2.0,
                stretch: false,
                head: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
                body: RowStyle { fill: None, color: PRIMARY_TEXT, bold: false },
                stripe: None,
                foot: RowStyle { fill: None, color: PRIMARY_TEXT, bold: true },
                bold_first_column: None,
            },
        };
        assert_eq!(
            table.column_widths(),
            Err(LayoutError::ColumnMismatch {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }
}
