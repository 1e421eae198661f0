//! ImageNet-1k indices that correspond to catalog foods.
//!
//! Several ImageNet labels can map to one food class; everything not listed
//! here is treated as non-food.

pub const IMAGENET_CLASSES: usize = 1000;

const FOOD_INDICES: &[(usize, &str)] = &[
    (927, "cake"),     // trifle
    (930, "bread"),    // French loaf
    (931, "bread"),    // bagel
    (933, "burger"),   // cheeseburger
    (934, "hotdog"),   // hotdog
    (936, "salad"),    // head cabbage
    (937, "broccoli"), // broccoli
    (939, "salad"),    // zucchini
    (943, "salad"),    // cucumber
    (948, "apple"),    // Granny Smith
    (950, "orange"),   // orange
    (954, "banana"),   // banana
    (959, "noodles"),  // carbonara
    (963, "pizza"),    // pizza
    (967, "coffee"),   // espresso
];

pub fn food_class(index: usize) -> Option<&'static str> {
    FOOD_INDICES
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, class)| *class)
}
