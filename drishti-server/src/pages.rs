// HTML pages for the browser front-end

use axum::http::StatusCode;
use drishti_eye::{Detection, JobReport};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
form { border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin-bottom: 1.5rem; }
img, video { max-width: 100%; border: 1px solid #ddd; }
table { border-collapse: collapse; margin-top: 1rem; }
td, th { border: 1px solid #ddd; padding: 0.25rem 0.6rem; text-align: left; }
.error { color: #b00020; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

pub fn index_page() -> String {
    layout(
        "Drishti object detection",
        r#"<h1>Drishti object detection</h1>
<form action="/upload_image" method="post" enctype="multipart/form-data">
  <h2>Image</h2>
  <input type="file" name="file" accept="image/*" required>
  <button type="submit">Detect</button>
</form>
<form action="/upload_video" method="post" enctype="multipart/form-data">
  <h2>Video</h2>
  <input type="file" name="file" accept="video/*" required>
  <button type="submit">Detect</button>
</form>"#,
    )
}

fn detection_table(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "<p>No objects detected.</p>".to_string();
    }
    let rows: String = detections
        .iter()
        .map(|d| {
            format!(
                "<tr><td>{}</td><td>{:.2}</td><td>{:.0}, {:.0}, {:.0} x {:.0}</td></tr>",
                escape(&d.class_name),
                d.confidence,
                d.bbox.x,
                d.bbox.y,
                d.bbox.width,
                d.bbox.height
            )
        })
        .collect();
    format!(
        "<table><tr><th>Object</th><th>Confidence</th><th>Box</th></tr>{}</table>",
        rows
    )
}

pub fn image_result_page(image_url: &str, download_url: &str, detections: &[Detection]) -> String {
    let body = format!(
        r#"<h1>Detection result</h1>
<img src="{}" alt="Annotated image">
<p><a href="{}">Download image</a> | <a href="/">Upload another</a></p>
{}"#,
        escape(image_url),
        escape(download_url),
        detection_table(detections)
    );
    layout("Detection result", &body)
}

pub fn video_result_page(video_url: &str, download_url: &str, report: &JobReport) -> String {
    let body = format!(
        r#"<h1>Detection result</h1>
<video src="{}" controls></video>
<p><a href="{}">Download video</a> | <a href="/">Upload another</a></p>
<p>{} frames at {}, {:.1} fps, processed in {:.1}s.</p>"#,
        escape(video_url),
        escape(download_url),
        report.frames_written,
        report.size,
        report.frame_rate,
        report.elapsed.as_secs_f64()
    );
    layout("Detection result", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back</a></p>",
        status.as_u16(),
        escape(message)
    );
    layout("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_index_has_both_forms() {
        let html = index_page();
        assert!(html.contains("action=\"/upload_image\""));
        assert!(html.contains("action=\"/upload_video\""));
        assert_eq!(html.matches("name=\"file\"").count(), 2);
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = error_page(StatusCode::NOT_FOUND, "File <script>.mp4 not found");
        assert!(html.contains("404"));
        assert!(html.contains("File &lt;script&gt;.mp4 not found"));
        assert!(!html.contains("<script>"));
    }
}
