pub mod pupil;
pub mod response;
