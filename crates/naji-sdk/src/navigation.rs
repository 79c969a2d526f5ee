//! Links and downloads, handed to the host because the sandbox blocks them.

use serde::Serialize;

use crate::NajiApp;
use crate::catalog::{DOWNLOAD_FILE, OPEN_LINK, OPEN_NM_LINK};

#[derive(Serialize)]
struct UrlPayload<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct PathPayload<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct DownloadPayload<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
}

impl NajiApp {
    /// Open an external URL in a new tab.
    pub fn open_link(&self, url: &str) {
        self.bridge.notify(OPEN_LINK, UrlPayload { url });
    }

    /// Open a messenger-internal path such as `settings` or `chat/durov`.
    pub fn open_nm_link(&self, path: &str) {
        self.bridge.notify(OPEN_NM_LINK, PathPayload { path });
    }

    pub fn download_file(&self, url: &str, filename: Option<&str>) {
        self.bridge
            .notify(DOWNLOAD_FILE, DownloadPayload { url, filename });
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::app;

    #[test]
    fn test_navigation_frames() {
        let (app, host) = app();

        app.open_link("https://naji.me");
        app.open_nm_link("chat/durov");
        app.download_file("https://cdn.naji.me/report.pdf", Some("report.pdf"));
        app.download_file("https://cdn.naji.me/raw.bin", None);

        let sent: Vec<_> = host.take_sent().into_iter().map(|f| f.to_value()).collect();
        assert_eq!(sent[0], json!({"type": "OPEN_LINK", "payload": {"url": "https://naji.me"}}));
        assert_eq!(sent[1], json!({"type": "OPEN_NM_LINK", "payload": {"path": "chat/durov"}}));
        assert_eq!(
            sent[2]["payload"],
            json!({"url": "https://cdn.naji.me/report.pdf", "filename": "report.pdf"})
        );
        assert_eq!(sent[3]["payload"], json!({"url": "https://cdn.naji.me/raw.bin"}));
    }
}
