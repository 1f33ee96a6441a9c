use minijinja::{context, Environment};
use serde::Serialize;

/// Typed HTML rendering. Templates are embedded at compile time and every
/// value is escaped by the template engine.
pub struct Views {
    env: Environment<'static>,
}

#[derive(Debug, Serialize)]
pub struct UploadView {
    pub file_name: String,
    pub download_url: String,
    pub qr_download_path: String,
    pub qr_view_path: String,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", include_str!("templates/index.html"))?;
        env.add_template("uploaded.html", include_str!("templates/uploaded.html"))?;
        Ok(Views { env })
    }

    pub fn index(&self, field: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template("index.html")?
            .render(context! { field })
    }

    pub fn upload_result(&self, view: &UploadView) -> Result<String, minijinja::Error> {
        self.env.get_template("uploaded.html")?.render(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_has_multipart_form() {
        let html = Views::new().unwrap().index("file").unwrap();
        assert!(html.contains(r#"enctype="multipart/form-data""#));
        assert!(html.contains(r#"name="file""#));
        assert!(html.contains(r#"method="post""#));
    }

    #[test]
    fn upload_result_escapes_values() {
        let view = UploadView {
            file_name: "<b>x</b>".into(),
            download_url: r#"http://h/?a="1"&b=2"#.into(),
            qr_download_path: "q".into(),
            qr_view_path: "v".into(),
        };
        let html = Views::new().unwrap().upload_result(&view).unwrap();
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("&amp;b=2"));
        assert!(!html.contains(r#""1""#));
    }

    #[test]
    fn upload_result_links_everything() {
        let view = UploadView {
            file_name: "report.pdf".into(),
            download_url: "DOWNLOAD".into(),
            qr_download_path: "QRDOWNLOAD".into(),
            qr_view_path: "QRVIEW".into(),
        };
        let html = Views::new().unwrap().upload_result(&view).unwrap();
        assert!(html.contains(r#"<a href="DOWNLOAD">"#));
        assert!(html.contains(r#"<a href="QRDOWNLOAD">"#));
        assert!(html.contains(r#"<img src="QRVIEW""#));
    }
}
