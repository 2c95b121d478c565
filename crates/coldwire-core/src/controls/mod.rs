//! Process-wide operational controls.

mod repository;

pub use repository::ControlsRepository;
