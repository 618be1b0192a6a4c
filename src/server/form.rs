//! The upload page (zh-CN).

use axum::response::Html;

pub const INVALID_TARGET: &str = "目标大小必须是正整数。";
pub const MISSING_FILE: &str = "请选择一个 PDF 文件。";
pub const SAVE_FAILED: &str = "无法保存上传的文件。";
pub const COMPRESS_FAILED: &str = "压缩失败：";
pub const NO_OUTPUT: &str = "未能生成压缩后的文件。";

const TEMPLATE: &str = r#"<!doctype html>
<html lang="zh-CN">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>PDF 压缩工具</title>
    <style>
      body { font-family: Arial, sans-serif; max-width: 760px; margin: 40px auto; padding: 0 16px; color: #222; }
      h1 { margin-bottom: 0.5em; }
      form { border: 1px solid #ddd; padding: 16px; border-radius: 6px; background: #fafafa; }
      label { display: block; margin: 12px 0 6px; font-weight: 600; }
      input[type="number"], input[type="file"] { width: 100%; }
      .error { color: #c0392b; margin-top: 12px; font-weight: 600; }
      .hint { color: #555; font-size: 0.95em; }
      button { margin-top: 16px; padding: 10px 16px; font-size: 1em; cursor: pointer; }
    </style>
  </head>
  <body>
    <h1>PDF 压缩工具</h1>
    <p class="hint">上传 PDF（最大 {max_input_mb}MB），压缩到目标大小（默认 {default_target_mb}MB）。</p>
    <form action="/compress" method="post" enctype="multipart/form-data">
      <label for="pdf">选择 PDF 文件：</label>
      <input id="pdf" name="pdf" type="file" accept="application/pdf" required />
      <div class="hint">文件不会持久保存，仅用于本次压缩。</div>

      <label for="target_mb">目标大小 (MB)：</label>
      <input id="target_mb" name="target_mb" type="number" value="{target_mb}" min="1" step="1" required />
      <div class="hint">数值越低压缩越激进。</div>

      <button type="submit">开始压缩</button>
{error}
    </form>
  </body>
</html>
"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(
    error: Option<&str>,
    target_mb: u32,
    default_target_mb: u32,
    max_input_mb: u64,
) -> Html<String> {
    let error = error
        .map(|e| format!("      <div class=\"error\">错误：{}</div>\n", escape(e)))
        .unwrap_or_default();
    Html(
        TEMPLATE
            .replace("{max_input_mb}", &max_input_mb.to_string())
            .replace("{default_target_mb}", &default_target_mb.to_string())
            .replace("{target_mb}", &target_mb.to_string())
            .replace("{error}", &error),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_error_text() {
        let Html(page) = render(Some("<b>\"x\" & y</b>"), 5, 100, 2000);
        assert!(page.contains("错误：&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;"));
        assert!(page.contains("value=\"5\""));
    }

    #[test]
    fn no_error_block_by_default() {
        let Html(page) = render(None, 100, 100, 2000);
        assert!(!page.contains("class=\"error\""));
        assert!(page.contains("最大 2000MB"));
    }
}
