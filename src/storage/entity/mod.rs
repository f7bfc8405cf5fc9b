pub mod family_member;
