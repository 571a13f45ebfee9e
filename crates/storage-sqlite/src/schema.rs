diesel::table! {
    observations (instrument, date) {
        instrument -> Text,
        date -> Text,
        price -> Double,
    }
}
