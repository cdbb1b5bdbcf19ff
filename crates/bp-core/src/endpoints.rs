//! Paths and URLs of the plugin's server routes.

use crate::labels::MAIN_DOC;

/// Route of the relay socket.
pub const SOCKET_PATH: &str = "/ps/ws";

/// Locales that ship translated workflow documents.
pub const WORKFLOW_LOCALES: [&str; 4] = ["ja-JP", "ko-KR", "zh-TW", "zh-CN"];
pub const FALLBACK_LOCALE: &str = "en-US";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Socket URL for this browser client.
pub fn socket_url(host: &str, port: &str, platform: &str, client_id: &str) -> String {
    if port.is_empty() {
        format!("ws://{host}{SOCKET_PATH}?platform={platform}&clientId={client_id}")
    } else {
        format!("ws://{host}:{port}{SOCKET_PATH}?platform={platform}&clientId={client_id}")
    }
}

/// `cm-` followed by nine base-36 characters drawn from `unit_random`,
/// which must yield values in `[0, 1)`.
pub fn client_id(mut unit_random: impl FnMut() -> f64) -> String {
    let mut id = String::from("cm-");
    for _ in 0..9 {
        let r = unit_random().clamp(0.0, 1.0 - f64::EPSILON);
        id.push(BASE36[(r * 36.0) as usize] as char);
    }
    id
}

/// Preview image for a slot, plus the selection mask for the main document.
pub fn preview_paths(label: &str) -> (String, Option<String>) {
    let image = format!("/ps/inputs/{label}.png");
    let selection = (label == MAIN_DOC).then(|| "/ps/inputs/SELECTION.png".to_string());
    (image, selection)
}

/// Name of the workflow document to fetch for `name` in `locale`.
pub fn workflow_document(name: &str, locale: Option<&str>) -> String {
    let locale = locale
        .filter(|l| WORKFLOW_LOCALES.contains(l))
        .unwrap_or(FALLBACK_LOCALE);
    format!("{name}_{locale}")
}

/// Fetch path of a workflow document, with the name percent-encoded.
pub fn workflow_path(document: &str) -> String {
    format!("/ps/workflows/{}", urlencoding::encode(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_carries_platform_and_client() {
        assert_eq!(
            socket_url("127.0.0.1", "8188", "cm", "cm-abc"),
            "ws://127.0.0.1:8188/ps/ws?platform=cm&clientId=cm-abc"
        );
    }

    #[test]
    fn client_id_is_prefixed_base36() {
        let mut n = 0.0;
        let id = client_id(|| {
            n += 0.1;
            n % 1.0
        });
        assert!(id.starts_with("cm-"));
        assert_eq!(id.len(), 12);
        assert!(id[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn only_main_doc_has_selection() {
        assert_eq!(
            preview_paths("MAIN DOC"),
            (
                "/ps/inputs/MAIN DOC.png".to_string(),
                Some("/ps/inputs/SELECTION.png".to_string())
            )
        );
        assert_eq!(preview_paths("bg").1, None);
    }

    #[test]
    fn unsupported_locale_falls_back() {
        assert_eq!(workflow_document("inpaint", Some("ko-KR")), "inpaint_ko-KR");
        assert_eq!(workflow_document("inpaint", Some("fr-FR")), "inpaint_en-US");
        assert_eq!(workflow_document("inpaint", None), "inpaint_en-US");
    }

    #[test]
    fn workflow_path_encodes_name() {
        assert_eq!(workflow_path("+simplifier_en-US"), "/ps/workflows/%2Bsimplifier_en-US");
        assert_eq!(workflow_path("MAIN DOC/ja-JP"), "/ps/workflows/MAIN%20DOC%2Fja-JP");
    }
}
