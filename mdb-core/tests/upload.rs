use mdb_core::upload::{upload_all_images, FsImageLoader, ImageUploader};
use mdb_core::MdbError;
use std::cell::RefCell;
use std::fs;
use tempfile::tempdir;

/// Hands out sequential CDN urls and records what it was sent.
#[derive(Default)]
struct CountingUploader {
    sent: RefCell<Vec<(String, String, usize)>>,
}

impl ImageUploader for CountingUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, MdbError> {
        let mut sent = self.sent.borrow_mut();
        sent.push((file_name.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://cdn.test/{}", sent.len()))
    }
}

#[tokio::test]
async fn uploads_files_next_to_the_document() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("assets/cat photo.png"), [1u8, 2, 3]).unwrap();
    fs::write(dir.path().join("dog.jpg"), [4u8]).unwrap();

    let md = "![cat](assets/cat%20photo.png)\n\n![[dog.jpg]]\n\n![gone](missing.gif)\n\n![web](https://x.test/a.png)";
    let uploader = CountingUploader::default();
    let report = upload_all_images(md, &FsImageLoader::new(dir.path()), &uploader).await;

    assert_eq!(report.uploaded, 2);
    assert_eq!(report.failed, 1);
    assert!(report.content.contains("![image](https://cdn.test/1)"));
    assert!(report.content.contains("![cat](https://cdn.test/2)"));
    assert!(report.content.contains("![gone](missing.gif)"));
    assert!(report.content.contains("![web](https://x.test/a.png)"));

    let sent = uploader.sent.borrow();
    assert_eq!(sent[0], ("dog.jpg".to_string(), "image/jpeg".to_string(), 1));
    assert_eq!(sent[1], ("cat%20photo.png".to_string(), "image/png".to_string(), 3));
}
