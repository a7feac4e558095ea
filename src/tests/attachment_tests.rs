//! tests/attachment_tests.rs

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use actix_rt::test;

    use crate::error::CampaignError;
    use crate::models::email_model::AttachmentUpload;
    use crate::services::attachment_service::{sanitize_filename, AttachmentService};
    use crate::tests::support::write_attachment;

    fn upload(filename: &str, data: &[u8]) -> AttachmentUpload {
        AttachmentUpload {
            filename: filename.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    async fn sanitize_strips_paths_and_unsafe_characters() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd.txt").as_deref(),
            Some("passwd.txt")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\ana\\lista precios.xlsx").as_deref(),
            Some("lista_precios.xlsx")
        );
        assert_eq!(sanitize_filename(".hidden.txt").as_deref(), Some("hidden.txt"));
        assert_eq!(sanitize_filename("///"), None);
        assert_eq!(sanitize_filename("ñ"), None);
    }

    #[test]
    async fn store_writes_files_under_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let service = AttachmentService::new(dir.path().join("uploads"));

        let stored = service
            .store(vec![upload("menu.pdf", b"%PDF"), upload("notes.txt", b"hola")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        let path = &stored["notes.txt"];
        assert!(path.starts_with(dir.path().join("uploads")));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_notes.txt"));
        assert_eq!(std::fs::read(path).unwrap(), b"hola");
    }

    #[test]
    async fn store_rejects_disallowed_types_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let uploads_dir = dir.path().join("uploads");
        let service = AttachmentService::new(&uploads_dir);

        let err = service
            .store(vec![upload("ok.pdf", b"%PDF"), upload("run.exe", b"MZ")])
            .await
            .unwrap_err();

        assert!(matches!(err, CampaignError::InvalidAttachment(_)));
        assert!(err.is_validation());
        assert_eq!(std::fs::read_dir(&uploads_dir).unwrap().count(), 0);
    }

    #[test]
    async fn store_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let service = AttachmentService::new(dir.path());

        let err = service
            .store(vec![upload("a.pdf", b"1"), upload("dir/a.pdf", b"2")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    async fn validate_lists_every_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = AttachmentService::new(dir.path());

        let mut attachments = BTreeMap::new();
        attachments.insert(
            "a.pdf".to_string(),
            write_attachment(dir.path(), "a.pdf", b"%PDF"),
        );
        attachments.insert("b.pdf".to_string(), dir.path().join("b.pdf"));
        attachments.insert("c.txt".to_string(), dir.path().join("c.txt"));

        match service.validate(&attachments).await {
            Err(CampaignError::MissingAttachments { names }) => {
                assert_eq!(names, vec!["b.pdf".to_string(), "c.txt".to_string()]);
            }
            other => panic!("se esperaba MissingAttachments: {other:?}"),
        }

        attachments.remove("b.pdf");
        attachments.remove("c.txt");
        assert!(service.validate(&attachments).await.is_ok());
    }

    #[test]
    async fn load_reads_bytes_with_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let service = AttachmentService::new(dir.path());

        let mut attachments = BTreeMap::new();
        attachments.insert(
            "flyer.png".to_string(),
            write_attachment(dir.path(), "stored_flyer.png", b"\x89PNG"),
        );
        attachments.insert(
            "data.xls".to_string(),
            write_attachment(dir.path(), "stored_data.xls", b"xls"),
        );

        let loaded = service.load(&attachments).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].filename, "data.xls");
        assert_eq!(loaded[0].content_type, "application/octet-stream");
        assert_eq!(loaded[1].filename, "flyer.png");
        assert_eq!(loaded[1].content_type, "image/png");
        assert_eq!(loaded[1].data, b"\x89PNG");
    }

    #[test]
    async fn cleanup_deletes_and_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = AttachmentService::new(dir.path());

        let present = write_attachment(dir.path(), "x.txt", b"x");
        let mut attachments = BTreeMap::new();
        attachments.insert("x.txt".to_string(), present.clone());
        attachments.insert("y.txt".to_string(), dir.path().join("y.txt"));

        service.cleanup(&attachments).await;
        assert!(!present.exists());

        // Segunda vez: no hay nada que borrar y no falla
        service.cleanup(&attachments).await;
    }
}
