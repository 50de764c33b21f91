//! The archive compiler.
//!
//! Walks the survey document and the blob store and produces the single
//! hierarchical project package. Compilation is read-only: it never mutates
//! photo status or survey fields, and a missing or unreadable blob degrades
//! to an omitted image rather than aborting the whole archive.

use std::io::{Cursor, Write};

use chrono::Utc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use osprey_core::error::{OspreyError, Result};
use osprey_core::models::SiteSurvey;
use osprey_store::ports::BlobStore;

use crate::kml::{image_entry_name, render_document};
use crate::sanitize::sanitize;

/// A compiled project package, ready for delivery.
#[derive(Debug, Clone)]
pub struct CompiledArchive {
    /// Final user-facing filename, `<Site>_OSP_EXPORT.zip`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn archive_err<E: std::fmt::Display>(e: E) -> OspreyError {
    OspreyError::Archive { reason: e.to_string() }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Compile the whole project into one archive:
///
/// ```text
/// <Site>_<timestamp>/
///   PROJECT_SUMMARY.txt
///   <Site>_REPORT.kmz          (doc.kml + images/)
///   POLES/<Pole>/metadata.txt
///   POLES/<Pole>/PHOTO_N.jpg
/// ```
pub async fn compile_archive(
    site: &SiteSurvey,
    blobs: &dyn BlobStore,
) -> Result<CompiledArchive> {
    let site_safe = sanitize(&site.site_name);
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let root = format!("{site_safe}_{timestamp}");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let report = generate_report_package(site, blobs).await?;
    zip.start_file(format!("{root}/{site_safe}_REPORT.kmz"), entry_options())
        .map_err(archive_err)?;
    zip.write_all(&report)?;

    let summary = format!(
        "PROJECT: {}\nUNIT: {}\nDATE: {}\nPOLE COUNT: {}",
        site.site_name,
        site.company_name,
        Utc::now().to_rfc3339(),
        site.poles.len()
    );
    zip.start_file(format!("{root}/PROJECT_SUMMARY.txt"), entry_options())
        .map_err(archive_err)?;
    zip.write_all(summary.as_bytes())?;

    for pole in &site.poles {
        let pole_dir = format!("{root}/POLES/{}", sanitize(&pole.name));

        let metadata = format!(
            "POLE ID: {}\nLAT: {}\nLNG: {}\nNOTES: {}",
            pole.name,
            pole.latitude,
            pole.longitude,
            if pole.notes.is_empty() { "None" } else { &pole.notes }
        );
        zip.start_file(format!("{pole_dir}/metadata.txt"), entry_options())
            .map_err(archive_err)?;
        zip.write_all(metadata.as_bytes())?;

        // Photos numbered in the pole's current in-memory order. A photo
        // whose binary is missing or unreadable is skipped; partial
        // evidence beats no archive.
        for (index, photo) in pole.photos.iter().enumerate() {
            match blobs.load_blob(photo.id).await {
                Ok(Some(bytes)) => {
                    zip.start_file(
                        format!("{pole_dir}/PHOTO_{}.jpg", index + 1),
                        entry_options(),
                    )
                    .map_err(archive_err)?;
                    zip.write_all(&bytes)?;
                }
                Ok(None) => {
                    tracing::warn!(
                        pole = %pole.name,
                        photo = %photo.id,
                        "Blob missing at export time; omitting from archive"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        pole = %pole.name,
                        photo = %photo.id,
                        error = %e,
                        "Blob read failed at export time; omitting from archive"
                    );
                }
            }
        }
    }

    let cursor = zip.finish().map_err(archive_err)?;
    Ok(CompiledArchive {
        file_name: format!("{site_safe}_OSP_EXPORT.zip"),
        bytes: cursor.into_inner(),
    })
}

/// Generate the report package for GIS software: the placemark document
/// plus its referenced images, zipped as a `.kmz`.
pub async fn generate_report_package(
    site: &SiteSurvey,
    blobs: &dyn BlobStore,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let kml = render_document(site)?;
    zip.start_file("doc.kml", entry_options()).map_err(archive_err)?;
    zip.write_all(kml.as_bytes())?;

    for pole in &site.poles {
        for (index, photo) in pole.photos.iter().enumerate() {
            match blobs.load_blob(photo.id).await {
                Ok(Some(bytes)) => {
                    zip.start_file(image_entry_name(pole, index), entry_options())
                        .map_err(archive_err)?;
                    zip.write_all(&bytes)?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        pole = %pole.name,
                        photo = %photo.id,
                        error = %e,
                        "Blob read failed at export time; omitting from package"
                    );
                }
            }
        }
    }

    let cursor = zip.finish().map_err(archive_err)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_core::models::{PhotoId, PoleSurvey, SurveyPhoto};
    use osprey_store::memory::MemoryBlobStore;
    use std::collections::BTreeSet;
    use zip::ZipArchive;

    async fn survey_with_photos() -> (SiteSurvey, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        let mut site = SiteSurvey::new_project();
        site.site_name = "Main St".to_string();

        let mut pole = PoleSurvey::at("POLE-001".into(), 40.0, -75.0, None).unwrap();
        for payload in [b"photo-a".as_slice(), b"photo-b".as_slice()] {
            let id = PhotoId::new();
            blobs.save_blob(id, payload).await.unwrap();
            pole.photos.push(SurveyPhoto::stored(id, "thumb".into(), None));
        }
        site.poles.push(pole);
        (site, blobs)
    }

    fn entry_names(bytes: &[u8]) -> BTreeSet<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn archive_has_the_documented_hierarchy() {
        let (site, blobs) = survey_with_photos().await;
        let compiled = compile_archive(&site, &blobs).await.unwrap();

        assert_eq!(compiled.file_name, "Main_St_OSP_EXPORT.zip");

        let names = entry_names(&compiled.bytes);
        let root = names
            .iter()
            .find(|n| n.ends_with("/PROJECT_SUMMARY.txt"))
            .unwrap()
            .trim_end_matches("/PROJECT_SUMMARY.txt")
            .to_string();
        assert!(root.starts_with("Main_St_"), "unexpected root {root}");

        assert!(names.contains(&format!("{root}/Main_St_REPORT.kmz")));
        assert!(names.contains(&format!("{root}/POLES/POLE-001/metadata.txt")));
        assert!(names.contains(&format!("{root}/POLES/POLE-001/PHOTO_1.jpg")));
        assert!(names.contains(&format!("{root}/POLES/POLE-001/PHOTO_2.jpg")));
    }

    #[tokio::test]
    async fn summary_and_metadata_text_match_the_survey() {
        let (site, blobs) = survey_with_photos().await;
        let compiled = compile_archive(&site, &blobs).await.unwrap();

        let names = entry_names(&compiled.bytes);
        let summary_name = names.iter().find(|n| n.ends_with("PROJECT_SUMMARY.txt")).unwrap();
        let summary = String::from_utf8(read_entry(&compiled.bytes, summary_name)).unwrap();
        assert!(summary.contains("PROJECT: Main St"));
        assert!(summary.contains("POLE COUNT: 1"));

        let meta_name = names.iter().find(|n| n.ends_with("metadata.txt")).unwrap();
        let metadata = String::from_utf8(read_entry(&compiled.bytes, meta_name)).unwrap();
        assert!(metadata.contains("LAT: 40"));
        assert!(metadata.contains("LNG: -75"));
        assert!(metadata.contains("NOTES: None"));
    }

    #[tokio::test]
    async fn report_package_contains_kml_and_images() {
        let (site, blobs) = survey_with_photos().await;
        let report = generate_report_package(&site, &blobs).await.unwrap();

        let names = entry_names(&report);
        assert!(names.contains("doc.kml"));
        assert!(names.contains("images/POLE-001_IMG_1.jpg"));
        assert!(names.contains("images/POLE-001_IMG_2.jpg"));

        let kml = String::from_utf8(read_entry(&report, "doc.kml")).unwrap();
        assert!(kml.contains("<coordinates>-75,40,0</coordinates>"));
    }

    #[tokio::test]
    async fn missing_blob_is_omitted_not_fatal() {
        let (mut site, blobs) = survey_with_photos().await;
        // A record whose binary was evicted.
        site.poles[0]
            .photos
            .push(SurveyPhoto::stored(PhotoId::new(), "thumb".into(), None));

        let compiled = compile_archive(&site, &blobs).await.unwrap();
        let names = entry_names(&compiled.bytes);

        assert!(names.iter().any(|n| n.ends_with("PHOTO_2.jpg")));
        assert!(!names.iter().any(|n| n.ends_with("PHOTO_3.jpg")));
    }

    /// Delegates to the inner store but fails reads of one corrupted blob.
    struct CorruptedBlobStore {
        inner: MemoryBlobStore,
        corrupted: PhotoId,
    }

    #[async_trait::async_trait]
    impl BlobStore for CorruptedBlobStore {
        async fn save_blob(&self, id: PhotoId, bytes: &[u8]) -> Result<()> {
            self.inner.save_blob(id, bytes).await
        }

        async fn load_blob(&self, id: PhotoId) -> Result<Option<Vec<u8>>> {
            if id == self.corrupted {
                return Err(OspreyError::StorageRead {
                    key: id.to_string(),
                    reason: "checksum mismatch".to_string(),
                });
            }
            self.inner.load_blob(id).await
        }

        async fn delete_blob(&self, id: PhotoId) -> Result<()> {
            self.inner.delete_blob(id).await
        }
    }

    #[tokio::test]
    async fn unreadable_blob_is_omitted_not_fatal() {
        let (site, blobs) = survey_with_photos().await;
        let corrupted = site.poles[0].photos[0].id;
        let blobs = CorruptedBlobStore { inner: blobs, corrupted };

        let compiled = compile_archive(&site, &blobs).await.unwrap();
        let names = entry_names(&compiled.bytes);
        assert!(!names.iter().any(|n| n.ends_with("PHOTO_1.jpg")));
        assert!(names.iter().any(|n| n.ends_with("PHOTO_2.jpg")));

        let report = generate_report_package(&site, &blobs).await.unwrap();
        let report_names = entry_names(&report);
        assert!(!report_names.contains("images/POLE-001_IMG_1.jpg"));
        assert!(report_names.contains("images/POLE-001_IMG_2.jpg"));
    }

    #[tokio::test]
    async fn compilation_is_idempotent_and_read_only() {
        let (site, blobs) = survey_with_photos().await;
        let before = site.clone();

        let first = compile_archive(&site, &blobs).await.unwrap();
        let second = compile_archive(&site, &blobs).await.unwrap();

        assert_eq!(site, before);
        assert_eq!(entry_names(&first.bytes).len(), entry_names(&second.bytes).len());

        let meta = |bytes: &[u8]| {
            let names = entry_names(bytes);
            let name = names.iter().find(|n| n.ends_with("metadata.txt")).unwrap().clone();
            read_entry(bytes, &name)
        };
        assert_eq!(meta(&first.bytes), meta(&second.bytes));
    }

    #[tokio::test]
    async fn unnameable_site_falls_back_to_literal_root() {
        let blobs = MemoryBlobStore::new();
        let mut site = SiteSurvey::new_project();
        site.site_name = "   ".to_string();

        let compiled = compile_archive(&site, &blobs).await.unwrap();
        assert_eq!(compiled.file_name, "Unknown_OSP_EXPORT.zip");
        let names = entry_names(&compiled.bytes);
        assert!(names.iter().all(|n| n.starts_with("Unknown_")));
    }
}
