//! Sample catalog used for demos: wipes the pet collection and inserts a
//! fixed list of twenty animals.

use crate::{errors::ServiceResult, models::pet::PetFields, services::pet_store::PetStore};
use tracing::info;

/// (name, breed, age, description)
pub const SAMPLE_PETS: [(&str, &str, u32, &str); 20] = [
    ("Buddy", "Golden Retriever", 3, "Friendly and energetic dog who loves playing fetch and swimming. Great with kids and other pets."),
    ("Luna", "Siamese Cat", 2, "Beautiful and intelligent cat with striking blue eyes. Very vocal and loves attention."),
    ("Max", "German Shepherd", 5, "Loyal and protective companion. Well-trained and excellent guard dog. Needs experienced owner."),
    ("Bella", "Labrador Mix", 4, "Sweet and gentle mixed breed. Perfect family dog who gets along with everyone."),
    ("Charlie", "Beagle", 6, "Friendly hunting dog with great nose. Loves long walks and exploring outdoors."),
    ("Lucy", "Persian Cat", 3, "Fluffy and calm indoor cat. Enjoys quiet environments and gentle petting."),
    ("Rocky", "Bulldog", 4, "Sturdy and affectionate companion. Low energy but very loving and loyal."),
    ("Daisy", "Border Collie", 2, "Highly intelligent and active herding dog. Needs mental stimulation and exercise."),
    ("Milo", "Maine Coon Cat", 5, "Large and gentle giant cat. Very social and gets along well with other pets."),
    ("Sadie", "Poodle", 3, "Hypoallergenic and intelligent breed. Great for families with allergies."),
    ("Jake", "Rottweiler", 4, "Strong and confident dog. Needs firm but loving training. Very protective of family."),
    ("Coco", "Ragdoll Cat", 1, "Young and playful kitten with beautiful blue eyes. Very docile and relaxed nature."),
    ("Zeus", "Great Dane", 6, "Gentle giant with calm temperament. Despite size, very friendly and good with children."),
    ("Nala", "Husky", 3, "Energetic and adventurous sled dog. Needs lots of exercise and mental stimulation."),
    ("Oliver", "British Shorthair", 4, "Calm and dignified cat with beautiful grey coat. Independent but affectionate."),
    ("Ruby", "Cocker Spaniel", 2, "Sweet and gentle sporting dog. Great with families and loves outdoor activities."),
    ("Toby", "Mixed Breed", 5, "Unique mixed breed with wonderful personality. Very adaptable and loving companion."),
    ("Princess", "Chihuahua", 3, "Small but mighty personality. Loyal to owner and makes excellent lap dog."),
    ("Bear", "Saint Bernard", 4, "Massive but gentle rescue dog. Great with kids and very patient and calm."),
    ("Whiskers", "Tabby Cat", 2, "Playful tabby with distinctive markings. Very social and loves interactive toys."),
];

/// Replace every pet with the sample list in one transaction.
pub async fn seed_sample_pets(store: &PetStore) -> ServiceResult<u64> {
    let pets: Vec<PetFields> = SAMPLE_PETS
        .iter()
        .map(|(name, breed, age, description)| PetFields::new(name, breed, *age, description))
        .collect();
    let inserted = store.replace_all(&pets).await?;
    info!("Successfully created {} sample pets!", inserted);
    Ok(inserted)
}
