pub mod layout;

use crate::error::FormatError;
use crate::models::Bill;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use layout::{DrawOp, FontWeight, Rgb8, PAGE_HEIGHT, PAGE_WIDTH};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use std::time::{Duration, Instant};

/// PDF 编码超时 (秒)
const ENCODE_TIMEOUT_SECS: u64 = 30;

fn fill_color(color: Rgb8) -> Color {
    let Rgb8(r, g, b) = color;
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn draw(layer: &PdfLayerReference, op: &DrawOp, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    match op {
        DrawOp::Text {
            text,
            x,
            y,
            size,
            weight,
            color,
        } => {
            let font = match weight {
                FontWeight::Regular => regular,
                FontWeight::Bold => bold,
            };
            layer.set_fill_color(fill_color(*color));
            // printpdf 的 y 轴自页面底部向上
            layer.use_text(text.clone(), *size, Mm(*x), Mm(PAGE_HEIGHT - *y), font);
        }
        DrawOp::Fill {
            x,
            y,
            width,
            height,
            color,
        } => {
            layer.set_fill_color(fill_color(*color));
            layer.add_rect(Rect::new(
                Mm(*x),
                Mm(PAGE_HEIGHT - *y - *height),
                Mm(*x + *width),
                Mm(PAGE_HEIGHT - *y),
            ));
        }
    }
}

/// 同步渲染 PDF 字节
pub fn render_document(bill: &Bill) -> Result<Vec<u8>, FormatError> {
    let layout = layout::layout_bill(bill);

    let title = format!("Vehicle Usage Bill - {}", bill.customer_name);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| FormatError::encode("pdf", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| FormatError::encode("pdf", e))?;

    for (idx, page) in layout.pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        for op in &page.ops {
            draw(&layer, op, &regular, &bold);
        }
    }

    doc.save_to_bytes().map_err(|e| FormatError::encode("pdf", e))
}

/// PDF 以 `data:application/pdf;base64,...` 形式返回
///
/// 渲染在阻塞线程池中进行, 超过 30 秒视为失败。
pub async fn format_as_pdf(bill: &Bill) -> Result<String, FormatError> {
    let start = Instant::now();
    let bill = bill.clone();
    let vehicles = bill.vehicles.len();

    let task = tokio::task::spawn_blocking(move || {
        render_document(&bill).map(|bytes| {
            format!("data:application/pdf;base64,{}", BASE64.encode(bytes))
        })
    });

    match tokio::time::timeout(Duration::from_secs(ENCODE_TIMEOUT_SECS), task).await {
        Ok(Ok(Ok(uri))) => {
            tracing::info!(
                "PDF generated for {} vehicles ({} bytes encoded) in {:?}",
                vehicles,
                uri.len(),
                start.elapsed()
            );
            Ok(uri)
        }
        Ok(Ok(Err(e))) => {
            tracing::error!("PDF generation failed after {:?}: {}", start.elapsed(), e);
            Err(e)
        }
        Ok(Err(join_error)) => {
            tracing::error!("PDF generation task aborted: {}", join_error);
            Err(FormatError::encode("pdf", join_error))
        }
        Err(_) => {
            tracing::error!("PDF generation timed out after {}s", ENCODE_TIMEOUT_SECS);
            Err(FormatError::Timeout {
                format: "pdf",
                seconds: ENCODE_TIMEOUT_SECS,
            })
        }
    }
}
