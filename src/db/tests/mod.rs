mod downloads;
mod migrations;
