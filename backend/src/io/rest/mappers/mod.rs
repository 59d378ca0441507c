pub mod donation_mapper;
pub mod student_mapper;

pub use donation_mapper::DonationMapper;
pub use student_mapper::StudentMapper;
