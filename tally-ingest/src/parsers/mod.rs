pub mod chase_card;
