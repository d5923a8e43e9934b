pub mod similarity_scorer;
pub mod track;
