pub mod clinical;
pub mod diary;
