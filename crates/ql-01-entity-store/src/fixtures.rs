//! Entity types used by the unit tests: a `Note` filed in a `Folder`.

use crate::domain::{Entity, EntityError, EntityResult, MetaData, Representation};
use crate::repository::EntityRepository;
use crate::service::EntityService;
use serde::{Deserialize, Serialize};
use shared_types::EntityId;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: EntityId,
    pub label: String,
}

impl Entity for Folder {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    pub folder: Folder,
}

impl Entity for Note {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: EntityId,
    pub title: String,
    pub folder_id: EntityId,
}

#[derive(Serialize, Deserialize)]
pub struct NormalizedNote {
    pub id: EntityId,
    pub title: String,
    pub folder: Folder,
}

pub struct FolderSchema;

impl MetaData for FolderSchema {
    type Entity = Folder;
    type Storable = Folder;
    type Normalized = Folder;

    fn name(&self) -> &'static str {
        "Folder"
    }

    fn from_storable(&self, _: &EntityRepository, storable: Folder) -> EntityResult<Folder> {
        Ok(storable)
    }

    fn normalize(&self, entity: &Folder) -> EntityResult<Folder> {
        Ok(entity.clone())
    }

    fn denormalize(&self, normalized: Folder) -> EntityResult<Folder> {
        Ok(normalized)
    }
}

impl Representation for FolderSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, entity: &Folder) -> EntityResult<Folder> {
        Ok(entity.clone())
    }

    fn keynames(&self, _: &Folder) -> EntityResult<Vec<String>> {
        Ok(vec!["folders".to_string()])
    }

    fn before_delete(&self, service: &EntityService, folder: &Folder) -> EntityResult<()> {
        let notes = service
            .store()
            .set_len(&format!("notes:by_folder_id:{}", folder.id))?;
        if notes > 0 {
            return Err(EntityError::conflict("Folder", format!("{} notes still filed", notes)));
        }
        Ok(())
    }
}

pub struct NoteSchema;

impl MetaData for NoteSchema {
    type Entity = Note;
    type Storable = NoteRecord;
    type Normalized = NormalizedNote;

    fn name(&self) -> &'static str {
        "Note"
    }

    fn from_storable(&self, repository: &EntityRepository, record: NoteRecord) -> EntityResult<Note> {
        let folder = repository.retrieve_by_id(&FolderSchema, &record.folder_id)?;
        Ok(Note {
            id: record.id,
            title: record.title,
            folder,
        })
    }

    fn normalize(&self, note: &Note) -> EntityResult<NormalizedNote> {
        Ok(NormalizedNote {
            id: note.id,
            title: note.title.clone(),
            folder: note.folder.clone(),
        })
    }

    fn denormalize(&self, normalized: NormalizedNote) -> EntityResult<Note> {
        Ok(Note {
            id: normalized.id,
            title: normalized.title,
            folder: normalized.folder,
        })
    }
}

impl Representation for NoteSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, note: &Note) -> EntityResult<NoteRecord> {
        Ok(NoteRecord {
            id: note.id,
            title: note.title.clone(),
            folder_id: note.folder.id,
        })
    }

    fn keynames(&self, note: &Note) -> EntityResult<Vec<String>> {
        Ok(vec![
            "notes".to_string(),
            format!("notes:by_folder_id:{}", note.folder.id),
        ])
    }

    fn sync(&self, service: &EntityService, note: &Note) -> EntityResult<()> {
        if note.title.is_empty() {
            return Err(EntityError::validation("Note", "the title must not be empty"));
        }
        if !service.repository().exists(&FolderSchema, &note.folder.id)? {
            service.save(&note.folder, &FolderSchema)?;
        }
        Ok(())
    }
}

pub fn make_folder(label: &str) -> Folder {
    Folder {
        id: Uuid::new_v4(),
        label: label.to_string(),
    }
}

pub fn make_note(title: &str, folder: &Folder) -> Note {
    Note {
        id: Uuid::new_v4(),
        title: title.to_string(),
        folder: folder.clone(),
    }
}
