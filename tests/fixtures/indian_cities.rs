//! City centres from OpenStreetMap for the cities offered in the search box.

use airwise::model::Location;

/// A named city centre.
#[derive(Debug, Clone, Copy)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl City {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.name, self.lat, self.lng)
    }
}

pub const DELHI: City = City::new("Delhi", 28.6139, 77.2090);
pub const GURGAON: City = City::new("Gurgaon", 28.4595, 77.0266);
pub const NOIDA: City = City::new("Noida", 28.5355, 77.3910);
pub const MUMBAI: City = City::new("Mumbai", 19.0760, 72.8777);
pub const PUNE: City = City::new("Pune", 18.5204, 73.8567);

pub const CITIES: &[City] = &[
    DELHI,
    GURGAON,
    NOIDA,
    MUMBAI,
    PUNE,
    City::new("Bangalore", 12.9716, 77.5946),
    City::new("Chennai", 13.0827, 80.2707),
    City::new("Hyderabad", 17.3850, 78.4867),
    City::new("Kolkata", 22.5726, 88.3639),
    City::new("Ahmedabad", 23.0225, 72.5714),
    City::new("Jaipur", 26.9124, 75.7873),
    City::new("Lucknow", 26.8467, 80.9462),
];
