pub mod toncenter_v3;
