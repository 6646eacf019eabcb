/// Topic bets are published on.
pub const BET_TOPIC: &str = "bet/data";

/// Topic spin results are broadcast on.
pub const RESULT_TOPIC: &str = "result/data";

/// Number of entries kept in each session history.
pub const HISTORY_CAPACITY: usize = 5;

/// Every pocket on an American wheel, in board order.
pub const POCKETS: [&str; 38] = [
    "0", "00", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15",
    "16", "17", "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31",
    "32", "33", "34", "35", "36",
];

/// Green pockets.
pub const GREEN_POCKETS: [&str; 2] = ["0", "00"];

/// Red pockets.
pub const RED_POCKETS: [&str; 18] = [
    "1", "3", "5", "7", "9", "12", "14", "16", "18", "19", "21", "23", "25", "27", "30", "32",
    "34", "36",
];

/// Black pockets.
pub const BLACK_POCKETS: [&str; 18] = [
    "2", "4", "6", "8", "10", "11", "13", "15", "17", "20", "22", "24", "26", "28", "29", "31",
    "33", "35",
];
