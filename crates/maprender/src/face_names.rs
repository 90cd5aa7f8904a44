use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceNameError {
    #[error("face name must not be empty")]
    Empty,
    #[error("face name must be relative, got leading '{character}'")]
    NotRelative { character: char },
    #[error("face name must not contain a '..' path segment")]
    ParentTraversal,
    #[error("face name must not contain an empty path segment")]
    EmptySegment,
    #[error("face name contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Face names double as paths below the faces directory, e.g. `floor/grass.111`.
pub(crate) fn validate_face_name(name: &str) -> Result<(), FaceNameError> {
    let Some(first) = name.chars().next() else {
        return Err(FaceNameError::Empty);
    };
    if matches!(first, '/' | '.') {
        return Err(FaceNameError::NotRelative { character: first });
    }
    for segment in name.split('/') {
        match segment {
            "" => return Err(FaceNameError::EmptySegment),
            ".." => return Err(FaceNameError::ParentTraversal),
            _ => {}
        }
    }
    if let Some(character) = name.chars().find(|ch| {
        !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-' | '.' | '/'))
    }) {
        return Err(FaceNameError::InvalidCharacter { character });
    }
    Ok(())
}
