use std::path::Path;
use tokio::fs;

use crate::lyrics::types::ProviderResult;

/// Read a local `.lrc` or plain-text transcript.
pub async fn read_transcript_file(path: &Path) -> ProviderResult {
    let raw = fs::read_to_string(path).await?;
    tracing::debug!(path = %path.display(), bytes = raw.len(), "Read local transcript");
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricsError;

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.lrc");
        std::fs::write(&path, "[00:01.00] hi\n").unwrap();
        assert_eq!(
            read_transcript_file(&path).await.unwrap().as_deref(),
            Some("[00:01.00] hi\n")
        );
    }

    #[tokio::test]
    async fn blank_file_is_none_and_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.lrc");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(read_transcript_file(&path).await.unwrap(), None);
        assert!(matches!(
            read_transcript_file(&dir.path().join("nope.lrc")).await,
            Err(LyricsError::Io(_))
        ));
    }
}
