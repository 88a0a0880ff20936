use pixdrop_storage::{AssetRecord, AssetStore, StagingStore, StorageError};

use crate::batch::BatchReport;

/// What happened to one report item when publishing.
#[derive(Debug)]
pub enum PublishOutcome {
    Published(AssetRecord),
    /// The item has nothing to deliver (rejected or failed).
    Skipped,
    Failed(StorageError),
}

/// Push every deliverable in `report` to `assets`, in report order.
///
/// Derivatives are published for successful items and staged originals for fallbacks.
/// A failure only affects its own item.
pub async fn publish_report(
    report: &BatchReport,
    staging: &dyn StagingStore,
    assets: &dyn AssetStore,
) -> Vec<PublishOutcome> {
    let mut outcomes = Vec::with_capacity(report.len());

    for item in report.items() {
        let deliverable = match item.result.deliverable() {
            Some(deliverable) => deliverable,
            None => {
                outcomes.push(PublishOutcome::Skipped);
                continue;
            }
        };

        let published = async {
            let data = staging.read(deliverable.name).await?;
            assets
                .upload(deliverable.name, deliverable.content_type, data)
                .await
        }
        .await;

        match published {
            Ok(record) => outcomes.push(PublishOutcome::Published(record)),
            Err(e) => {
                tracing::warn!(
                    index = item.index,
                    key = %deliverable.name,
                    error = %e,
                    "Failed to publish deliverable"
                );
                outcomes.push(PublishOutcome::Failed(e));
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchCoordinator;
    use pixdrop_core::models::{TransformSpec, UploadItem, ValidationPolicy};
    use pixdrop_storage::{LocalAssetStore, LocalStagingStore};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            20,
            10,
            image::Rgb([200, 100, 50]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_publish_report() {
        let dir = tempdir().unwrap();
        let staging = LocalStagingStore::new(dir.path().join("uploads")).await.unwrap();
        let assets = LocalAssetStore::new(dir.path().join("public"), "http://cdn")
            .await
            .unwrap();

        let coordinator = BatchCoordinator::new(
            Arc::new(staging.clone()),
            ValidationPolicy::default(),
            TransformSpec::default(),
        );
        let report = coordinator
            .process_batch(vec![
                UploadItem::new("ok.png", "image/png", png_bytes()),
                UploadItem::new("bad.txt", "text/plain", vec![1]),
                UploadItem::new("broken.png", "image/png", b"not a png".to_vec()),
            ])
            .await;

        let outcomes = publish_report(&report, &staging, &assets).await;
        assert_eq!(outcomes.len(), 3);

        match &outcomes[0] {
            PublishOutcome::Published(record) => {
                assert!(record.name.ends_with("-processed.jpg"));
                assert_eq!(record.content_type, "image/jpeg");
            }
            other => panic!("expected published derivative, got {:?}", other),
        }
        assert!(matches!(outcomes[1], PublishOutcome::Skipped));
        match &outcomes[2] {
            PublishOutcome::Published(record) => {
                assert!(record.name.ends_with(".png"));
                assert_eq!(record.size_bytes, 9);
            }
            other => panic!("expected published original, got {:?}", other),
        }

        assert_eq!(assets.list(30).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_missing_file_fails_only_that_item() {
        let dir = tempdir().unwrap();
        let staging = LocalStagingStore::new(dir.path().join("uploads")).await.unwrap();
        let assets = LocalAssetStore::new(dir.path().join("public"), "http://cdn")
            .await
            .unwrap();

        let coordinator = BatchCoordinator::new(
            Arc::new(staging.clone()),
            ValidationPolicy::default(),
            TransformSpec::default(),
        );
        let report = coordinator
            .process_batch(vec![
                UploadItem::new("a.png", "image/png", png_bytes()),
                UploadItem::new("b.png", "image/png", png_bytes()),
            ])
            .await;

        let first = report.get(0).unwrap().result.deliverable().unwrap().name;
        staging.delete(first).await.unwrap();

        let outcomes = publish_report(&report, &staging, &assets).await;
        assert!(matches!(
            outcomes[0],
            PublishOutcome::Failed(StorageError::NotFound(_))
        ));
        assert!(matches!(outcomes[1], PublishOutcome::Published(_)));
    }
}
