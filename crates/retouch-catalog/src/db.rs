use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::models::{NewPhoto, Photo, PhotoId, StoredPhoto};
use crate::store::{CatalogError, PhotoStore, clamp_title, validate_mime, validate_size};

const PHOTO_COLUMNS: &str = "id, title, filename, mime_type, size, width, height,
                             content_hash, derived_from, created_at";

pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog database {}", path.display()))?;
        let catalog = Self { conn };
        catalog.migrate()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn };
        catalog.migrate()?;
        Ok(catalog)
    }

    fn migrate(&self) -> Result<()> {
        info!("running catalog migrations");
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS photos (
                id           INTEGER PRIMARY KEY,
                title        TEXT NOT NULL,
                filename     TEXT NOT NULL,
                mime_type    TEXT NOT NULL,
                size         INTEGER NOT NULL,
                width        INTEGER,
                height       INTEGER,
                content_hash TEXT NOT NULL,
                content      BLOB NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_photos_hash ON photos(content_hash);
            ",
        )?;

        let alter_stmts = ["ALTER TABLE photos ADD COLUMN derived_from INTEGER REFERENCES photos(id)"];
        for stmt in alter_stmts {
            match self.conn.execute(stmt, []) {
                Ok(_) => {}
                Err(e) if e.to_string().contains("duplicate column") => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Validate and store an upload as a new photo record.
    pub fn insert_photo(&self, photo: &NewPhoto) -> Result<Photo> {
        let mime = validate_mime(&photo.mime_type)?;
        validate_size(photo.bytes.len())?;
        let (width, height) = image::ImageReader::new(Cursor::new(&photo.bytes))
            .with_guessed_format()
            .context("failed to sniff upload format")?
            .into_dimensions()
            .map_err(|e| CatalogError::InvalidImage(e.to_string()))?;

        let title = clamp_title(photo.title.as_deref().unwrap_or(&photo.filename));
        let hash = blake3::hash(&photo.bytes).to_hex().to_string();
        self.conn.execute(
            "INSERT INTO photos (
                title, filename, mime_type, size, width, height,
                content_hash, content, derived_from
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                title,
                photo.filename,
                mime,
                photo.bytes.len() as i64,
                width,
                height,
                hash,
                photo.bytes,
                photo.derived_from,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, %title, size = photo.bytes.len(), "photo stored");
        self.get_photo(id)?.ok_or_else(|| CatalogError::NotFound(id).into())
    }

    pub fn get_photo(&self, id: PhotoId) -> Result<Option<Photo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], row_to_photo)?;
        Ok(rows.next().transpose()?)
    }

    pub fn get_content(&self, id: PhotoId) -> Result<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row("SELECT content FROM photos WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Newest first.
    pub fn list_photos(&self) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos ORDER BY created_at DESC, id DESC"
        ))?;
        let photos = stmt
            .query_map([], row_to_photo)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    pub fn find_by_hash(&self, hash: &str) -> Result<Vec<PhotoId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM photos WHERE content_hash = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![hash], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn update_title(&self, id: PhotoId, title: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE photos SET title = ?1 WHERE id = ?2",
            params![clamp_title(title), id],
        )?;
        Ok(changed > 0)
    }

    /// Remove a photo. Exports derived from it keep their content and lose
    /// the back-reference.
    pub fn delete_photo(&self, id: PhotoId) -> Result<bool> {
        self.conn.execute(
            "UPDATE photos SET derived_from = NULL WHERE derived_from = ?1",
            params![id],
        )?;
        let changed = self
            .conn
            .execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn photo_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?)
    }
}

impl PhotoStore for Catalog {
    fn fetch(&self, id: PhotoId) -> Result<StoredPhoto> {
        let photo = self.get_photo(id)?.ok_or(CatalogError::NotFound(id))?;
        let bytes = self.get_content(id)?.ok_or(CatalogError::NotFound(id))?;
        Ok(StoredPhoto { photo, bytes })
    }

    fn upload(&self, photo: NewPhoto) -> Result<Photo> {
        self.insert_photo(&photo)
    }

    fn delete(&self, id: PhotoId) -> Result<bool> {
        self.delete_photo(id)
    }

    fn list(&self) -> Result<Vec<Photo>> {
        self.list_photos()
    }

    fn rename(&self, id: PhotoId, title: &str) -> Result<bool> {
        self.update_title(id, title)
    }
}

fn row_to_photo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        title: row.get(1)?,
        filename: row.get(2)?,
        mime_type: row.get(3)?,
        size: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        content_hash: row.get(7)?,
        derived_from: row.get(8)?,
        created_at: row.get(9)?,
    })
}
