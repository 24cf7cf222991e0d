pub mod pupil_service;
