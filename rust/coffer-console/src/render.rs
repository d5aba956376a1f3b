use std::fmt::Write;

use coffer_storage::ObjectSummary;

use crate::{ConsoleState, OperationStatus};

impl ConsoleState {
    /// Plain-text rendering, one line per fact.
    pub fn render(&self) -> String {
        let mut out = String::new();

        match &self.identity {
            OperationStatus::Idle => out.push_str("Not signed in\n"),
            OperationStatus::Loading => out.push_str("Loading identity...\n"),
            OperationStatus::Succeeded(view) => {
                let _ = writeln!(out, "User ID:     {}", view.user_id);
                let _ = writeln!(out, "Signed in:   {}", view.display_label);
                if let Some(identity_id) = &view.identity_id {
                    let _ = writeln!(out, "Identity ID: {}", identity_id);
                }
                let _ = writeln!(out, "Access key:  {}", view.masked_access_key);
            }
            OperationStatus::Failed(message) => {
                let _ = writeln!(out, "Error: {}", message);
                out.push_str("Run `refresh` to retry.\n");
            }
        }

        if self.bucket.is_empty() {
            out.push_str("Bucket:      (none)\n");
        } else {
            let _ = writeln!(out, "Bucket:      {}", self.bucket);
        }

        match &self.upload {
            OperationStatus::Idle => {}
            OperationStatus::Loading => out.push_str("Uploading test object...\n"),
            OperationStatus::Succeeded(receipt) => {
                let _ = writeln!(out, "Uploaded:    {}", receipt.key);
            }
            OperationStatus::Failed(message) => {
                let _ = writeln!(out, "Upload failed: {}", message);
            }
        }

        match &self.listing {
            OperationStatus::Idle => {}
            OperationStatus::Loading => out.push_str("Listing objects...\n"),
            OperationStatus::Succeeded(objects) if objects.is_empty() => {
                out.push_str("No objects in bucket\n");
            }
            OperationStatus::Succeeded(objects) => {
                let _ = writeln!(out, "Objects ({}):", objects.len());
                for object in objects {
                    let _ = writeln!(out, "  {}", render_object(object));
                }
            }
            OperationStatus::Failed(message) => {
                let _ = writeln!(out, "Listing failed: {}", message);
            }
        }

        out
    }
}

fn render_object(object: &ObjectSummary) -> String {
    let mut line = object.key.clone();
    if let Some(size) = object.size_bytes {
        let _ = write!(line, "  {} B", size);
    }
    if let Some(modified) = object.last_modified {
        let _ = write!(line, "  {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityView;
    use chrono::{TimeZone, Utc};
    use coffer_storage::PutReceipt;

    #[test]
    fn it_renders_signed_in_listing() {
        let state = ConsoleState {
            bucket: "photos".into(),
            identity: OperationStatus::Succeeded(IdentityView {
                user_id: "user-1".into(),
                display_label: "user@example.com".into(),
                identity_id: None,
                masked_access_key: "ASIAXAMPLE...".into(),
            }),
            listing: OperationStatus::Succeeded(vec![ObjectSummary {
                key: "a.txt".into(),
                size_bytes: Some(4),
                last_modified: Some(Utc.with_ymd_and_hms(2025, 5, 7, 5, 48, 59).unwrap()),
            }]),
            upload: OperationStatus::Succeeded(PutReceipt {
                key: "test-1.txt".into(),
                e_tag: None,
            }),
        };

        let text = state.render();
        assert!(text.contains("User ID:     user-1"));
        assert!(text.contains("Signed in:   user@example.com"));
        assert!(!text.contains("Identity ID"));
        assert!(text.contains("Access key:  ASIAXAMPLE..."));
        assert!(text.contains("Uploaded:    test-1.txt"));
        assert!(text.contains("Objects (1):"));
        assert!(text.contains("  a.txt  4 B  2025-05-07 05:48:59 UTC"));
    }

    #[test]
    fn it_renders_failure_with_retry_hint() {
        let state = ConsoleState {
            identity: OperationStatus::Failed("credential issuer rejected the session".into()),
            ..Default::default()
        };

        let text = state.render();
        assert!(text.contains("Error: credential issuer rejected the session"));
        assert!(text.contains("refresh"));
        assert!(text.contains("Bucket:      (none)"));
        assert_eq!(text.matches("rejected the session").count(), 1);
        assert!(state.has_failure());
    }

    #[test]
    fn it_renders_empty_bucket() {
        let state = ConsoleState {
            bucket: "photos".into(),
            listing: OperationStatus::Succeeded(Vec::new()),
            ..Default::default()
        };

        assert!(state.render().contains("No objects in bucket"));
    }
}
