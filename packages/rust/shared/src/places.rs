//! Curated US place tables used by city extraction and geocoding fallbacks.
//!
//! The first city listed for each state is that state's default city.

/// A city with its approximate centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

/// A US state with its major cities.
#[derive(Debug)]
pub struct StateInfo {
    /// Two-letter postal code.
    pub code: &'static str,
    /// Full state name.
    pub name: &'static str,
    /// Major cities; the first entry is the default city.
    pub cities: &'static [City],
}

impl StateInfo {
    /// The state's default city (first table entry).
    pub fn default_city(&self) -> &'static City {
        &self.cities[0]
    }

    /// Look up a city case-insensitively.
    pub fn find_city(&self, name: &str) -> Option<&'static City> {
        let name = name.trim();
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Axis-aligned sanity box for plausible coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

/// Covers the 50 states including Alaska and Hawaii.
pub const US_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 18.5,
    max_lat: 71.5,
    min_lng: -179.9,
    max_lng: -66.5,
};

/// Geographic center of the contiguous US (near Lebanon, Kansas).
pub const COUNTRY_CENTROID: City = c("United States", 39.828_3, -98.579_5);

const fn c(name: &'static str, lat: f64, lng: f64) -> City {
    City { name, lat, lng }
}

/// Look up a state by its two-letter code (case-insensitive).
pub fn state_by_code(code: &str) -> Option<&'static StateInfo> {
    let code = code.trim();
    STATES.iter().find(|s| s.code.eq_ignore_ascii_case(code))
}

/// Look up a state by its full name (case-insensitive).
pub fn state_by_name(name: &str) -> Option<&'static StateInfo> {
    let name = name.trim();
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Resolve either a code or a full name.
pub fn find_state(code_or_name: &str) -> Option<&'static StateInfo> {
    state_by_code(code_or_name).or_else(|| state_by_name(code_or_name))
}

pub static STATES: &[StateInfo] = &[
    StateInfo { code: "AL", name: "Alabama", cities: &[c("Birmingham", 33.5186, -86.8104), c("Huntsville", 34.7304, -86.5861), c("Montgomery", 32.3668, -86.3000), c("Mobile", 30.6954, -88.0399)] },
    StateInfo { code: "AK", name: "Alaska", cities: &[c("Anchorage", 61.2181, -149.9003), c("Fairbanks", 64.8378, -147.7164), c("Juneau", 58.3019, -134.4197), c("Wasilla", 61.5814, -149.4394)] },
    StateInfo { code: "AZ", name: "Arizona", cities: &[c("Phoenix", 33.4484, -112.0740), c("Tucson", 32.2226, -110.9747), c("Mesa", 33.4152, -111.8315), c("Tempe", 33.4255, -111.9400), c("Scottsdale", 33.4942, -111.9261), c("Chandler", 33.3062, -111.8413), c("Gilbert", 33.3528, -111.7890), c("Flagstaff", 35.1983, -111.6513), c("Prescott", 34.5400, -112.4685)] },
    StateInfo { code: "AR", name: "Arkansas", cities: &[c("Little Rock", 34.7465, -92.2896), c("Fayetteville", 36.0626, -94.1574), c("Bentonville", 36.3729, -94.2088), c("Fort Smith", 35.3859, -94.3985)] },
    StateInfo { code: "CA", name: "California", cities: &[c("Los Angeles", 34.0522, -118.2437), c("San Diego", 32.7157, -117.1611), c("San Francisco", 37.7749, -122.4194), c("San Jose", 37.3382, -121.8863), c("Sacramento", 38.5816, -121.4944), c("Oakland", 37.8044, -122.2712), c("Fresno", 36.7378, -119.7871), c("Santa Barbara", 34.4208, -119.6982), c("Santa Cruz", 36.9741, -122.0308), c("Ventura", 34.2746, -119.2290), c("Oceanside", 33.1959, -117.3795), c("Costa Mesa", 33.6411, -117.9187), c("Irvine", 33.6846, -117.8265), c("Anaheim", 33.8366, -117.9143), c("Riverside", 33.9806, -117.3755), c("Temecula", 33.4936, -117.1484), c("San Luis Obispo", 35.2828, -120.6596), c("Redding", 40.5865, -122.3917)] },
    StateInfo { code: "CO", name: "Colorado", cities: &[c("Denver", 39.7392, -104.9903), c("Boulder", 40.0150, -105.2705), c("Colorado Springs", 38.8339, -104.8214), c("Fort Collins", 40.5853, -105.0844), c("Golden", 39.7555, -105.2211), c("Longmont", 40.1672, -105.1019), c("Grand Junction", 39.0639, -108.5506), c("Durango", 37.2753, -107.8801)] },
    StateInfo { code: "CT", name: "Connecticut", cities: &[c("Hartford", 41.7658, -72.6734), c("New Haven", 41.3083, -72.9279), c("Stamford", 41.0534, -73.5387), c("Bridgeport", 41.1865, -73.1952)] },
    StateInfo { code: "DE", name: "Delaware", cities: &[c("Wilmington", 39.7391, -75.5398), c("Dover", 39.1582, -75.5244), c("Newark", 39.6837, -75.7497)] },
    StateInfo { code: "FL", name: "Florida", cities: &[c("Orlando", 28.5383, -81.3792), c("Miami", 25.7617, -80.1918), c("Tampa", 27.9506, -82.4572), c("Jacksonville", 30.3322, -81.6557), c("St. Petersburg", 27.7676, -82.6403), c("Sarasota", 27.3364, -82.5307), c("Fort Lauderdale", 26.1224, -80.1373), c("Tallahassee", 30.4383, -84.2807), c("Gainesville", 29.6516, -82.3248)] },
    StateInfo { code: "GA", name: "Georgia", cities: &[c("Atlanta", 33.7490, -84.3880), c("Savannah", 32.0809, -81.0912), c("Athens", 33.9519, -83.3576), c("Augusta", 33.4735, -82.0105), c("Marietta", 33.9526, -84.5499)] },
    StateInfo { code: "HI", name: "Hawaii", cities: &[c("Honolulu", 21.3069, -157.8583), c("Hilo", 19.7071, -155.0885), c("Kailua", 21.4022, -157.7394), c("Kahului", 20.8893, -156.4729)] },
    StateInfo { code: "ID", name: "Idaho", cities: &[c("Boise", 43.6150, -116.2023), c("Idaho Falls", 43.4917, -112.0339), c("Coeur d'Alene", 47.6777, -116.7805), c("Nampa", 43.5407, -116.5635), c("Sandpoint", 48.2766, -116.5535)] },
    StateInfo { code: "IL", name: "Illinois", cities: &[c("Chicago", 41.8781, -87.6298), c("Springfield", 39.7817, -89.6501), c("Naperville", 41.7508, -88.1535), c("Peoria", 40.6936, -89.5890), c("Rockford", 42.2711, -89.0940)] },
    StateInfo { code: "IN", name: "Indiana", cities: &[c("Indianapolis", 39.7684, -86.1581), c("Fort Wayne", 41.0793, -85.1394), c("Elkhart", 41.6820, -85.9767), c("Bloomington", 39.1653, -86.5264), c("South Bend", 41.6764, -86.2520)] },
    StateInfo { code: "IA", name: "Iowa", cities: &[c("Des Moines", 41.5868, -93.6250), c("Cedar Rapids", 41.9779, -91.6656), c("Iowa City", 41.6611, -91.5302), c("Davenport", 41.5236, -90.5776)] },
    StateInfo { code: "KS", name: "Kansas", cities: &[c("Wichita", 37.6872, -97.3301), c("Kansas City", 39.1142, -94.6275), c("Topeka", 39.0473, -95.6752), c("Lawrence", 38.9717, -95.2353), c("Overland Park", 38.9822, -94.6708)] },
    StateInfo { code: "KY", name: "Kentucky", cities: &[c("Louisville", 38.2527, -85.7585), c("Lexington", 38.0406, -84.5037), c("Bowling Green", 36.9685, -86.4808), c("Frankfort", 38.2009, -84.8733)] },
    StateInfo { code: "LA", name: "Louisiana", cities: &[c("New Orleans", 29.9511, -90.0715), c("Baton Rouge", 30.4515, -91.1871), c("Lafayette", 30.2241, -92.0198), c("Shreveport", 32.5252, -93.7502)] },
    StateInfo { code: "ME", name: "Maine", cities: &[c("Portland", 43.6591, -70.2568), c("Bangor", 44.8016, -68.7712), c("Augusta", 44.3106, -69.7795), c("Lewiston", 44.1004, -70.2148)] },
    StateInfo { code: "MD", name: "Maryland", cities: &[c("Baltimore", 39.2904, -76.6122), c("Annapolis", 38.9784, -76.4922), c("Frederick", 39.4143, -77.4105), c("Rockville", 39.0840, -77.1528)] },
    StateInfo { code: "MA", name: "Massachusetts", cities: &[c("Boston", 42.3601, -71.0589), c("Worcester", 42.2626, -71.8023), c("Springfield", 42.1015, -72.5898), c("Cambridge", 42.3736, -71.1097)] },
    StateInfo { code: "MI", name: "Michigan", cities: &[c("Detroit", 42.3314, -83.0458), c("Grand Rapids", 42.9634, -85.6681), c("Ann Arbor", 42.2808, -83.7430), c("Lansing", 42.7325, -84.5555), c("Traverse City", 44.7631, -85.6206)] },
    StateInfo { code: "MN", name: "Minnesota", cities: &[c("Minneapolis", 44.9778, -93.2650), c("St. Paul", 44.9537, -93.0900), c("Duluth", 46.7867, -92.1005), c("Rochester", 44.0121, -92.4802)] },
    StateInfo { code: "MS", name: "Mississippi", cities: &[c("Jackson", 32.2988, -90.1848), c("Gulfport", 30.3674, -89.0928), c("Hattiesburg", 31.3271, -89.2903), c("Oxford", 34.3665, -89.5192)] },
    StateInfo { code: "MO", name: "Missouri", cities: &[c("Kansas City", 39.0997, -94.5786), c("St. Louis", 38.6270, -90.1994), c("Springfield", 37.2090, -93.2923), c("Columbia", 38.9517, -92.3341)] },
    StateInfo { code: "MT", name: "Montana", cities: &[c("Bozeman", 45.6770, -111.0429), c("Missoula", 46.8721, -113.9940), c("Billings", 45.7833, -108.5007), c("Whitefish", 48.4111, -114.3376), c("Helena", 46.5891, -112.0391)] },
    StateInfo { code: "NE", name: "Nebraska", cities: &[c("Omaha", 41.2565, -95.9345), c("Lincoln", 40.8136, -96.7026), c("Kearney", 40.6993, -99.0832)] },
    StateInfo { code: "NV", name: "Nevada", cities: &[c("Las Vegas", 36.1699, -115.1398), c("Reno", 39.5296, -119.8138), c("Henderson", 36.0395, -114.9817), c("Carson City", 39.1638, -119.7674)] },
    StateInfo { code: "NH", name: "New Hampshire", cities: &[c("Manchester", 42.9956, -71.4548), c("Concord", 43.2081, -71.5376), c("Nashua", 42.7654, -71.4676), c("Portsmouth", 43.0718, -70.7626)] },
    StateInfo { code: "NJ", name: "New Jersey", cities: &[c("Newark", 40.7357, -74.1724), c("Jersey City", 40.7178, -74.0431), c("Trenton", 40.2206, -74.7597), c("Toms River", 39.9537, -74.1979)] },
    StateInfo { code: "NM", name: "New Mexico", cities: &[c("Albuquerque", 35.0844, -106.6504), c("Santa Fe", 35.6870, -105.9378), c("Las Cruces", 32.3199, -106.7637), c("Taos", 36.4072, -105.5731)] },
    StateInfo { code: "NY", name: "New York", cities: &[c("New York", 40.7128, -74.0060), c("Buffalo", 42.8864, -78.8784), c("Rochester", 43.1566, -77.6088), c("Albany", 42.6526, -73.7562), c("Syracuse", 43.0481, -76.1474), c("Brooklyn", 40.6782, -73.9442)] },
    StateInfo { code: "NC", name: "North Carolina", cities: &[c("Charlotte", 35.2271, -80.8431), c("Raleigh", 35.7796, -78.6382), c("Asheville", 35.5951, -82.5515), c("Durham", 35.9940, -78.8986), c("Greensboro", 36.0726, -79.7920), c("Wilmington", 34.2257, -77.9447)] },
    StateInfo { code: "ND", name: "North Dakota", cities: &[c("Fargo", 46.8772, -96.7898), c("Bismarck", 46.8083, -100.7837), c("Grand Forks", 47.9253, -97.0329)] },
    StateInfo { code: "OH", name: "Ohio", cities: &[c("Columbus", 39.9612, -82.9988), c("Cleveland", 41.4993, -81.6944), c("Cincinnati", 39.1031, -84.5120), c("Dayton", 39.7589, -84.1916), c("Akron", 41.0814, -81.5190)] },
    StateInfo { code: "OK", name: "Oklahoma", cities: &[c("Oklahoma City", 35.4676, -97.5164), c("Tulsa", 36.1540, -95.9928), c("Norman", 35.2226, -97.4395)] },
    StateInfo { code: "OR", name: "Oregon", cities: &[c("Portland", 45.5152, -122.6784), c("Bend", 44.0582, -121.3153), c("Eugene", 44.0521, -123.0868), c("Salem", 44.9429, -123.0351), c("Hood River", 45.7054, -121.5215), c("Medford", 42.3265, -122.8756)] },
    StateInfo { code: "PA", name: "Pennsylvania", cities: &[c("Philadelphia", 39.9526, -75.1652), c("Pittsburgh", 40.4406, -79.9959), c("Harrisburg", 40.2732, -76.8867), c("Allentown", 40.6023, -75.4714), c("Lancaster", 40.0379, -76.3055)] },
    StateInfo { code: "RI", name: "Rhode Island", cities: &[c("Providence", 41.8240, -71.4128), c("Warwick", 41.7001, -71.4162), c("Newport", 41.4901, -71.3128)] },
    StateInfo { code: "SC", name: "South Carolina", cities: &[c("Charleston", 32.7765, -79.9311), c("Columbia", 34.0007, -81.0348), c("Greenville", 34.8526, -82.3940), c("Myrtle Beach", 33.6891, -78.8867)] },
    StateInfo { code: "SD", name: "South Dakota", cities: &[c("Sioux Falls", 43.5446, -96.7311), c("Rapid City", 44.0805, -103.2310), c("Pierre", 44.3683, -100.3510)] },
    StateInfo { code: "TN", name: "Tennessee", cities: &[c("Nashville", 36.1627, -86.7816), c("Knoxville", 35.9606, -83.9207), c("Chattanooga", 35.0456, -85.3097), c("Memphis", 35.1495, -90.0490)] },
    StateInfo { code: "TX", name: "Texas", cities: &[c("Austin", 30.2672, -97.7431), c("Houston", 29.7604, -95.3698), c("Dallas", 32.7767, -96.7970), c("San Antonio", 29.4241, -98.4936), c("Fort Worth", 32.7555, -97.3308), c("El Paso", 31.7619, -106.4850), c("Round Rock", 30.5083, -97.6789), c("New Braunfels", 29.7030, -98.1245)] },
    StateInfo { code: "UT", name: "Utah", cities: &[c("Salt Lake City", 40.7608, -111.8910), c("Provo", 40.2338, -111.6585), c("Ogden", 41.2230, -111.9738), c("Park City", 40.6461, -111.4980), c("St. George", 37.0965, -113.5684), c("Moab", 38.5733, -109.5498)] },
    StateInfo { code: "VT", name: "Vermont", cities: &[c("Burlington", 44.4759, -73.2121), c("Montpelier", 44.2601, -72.5754), c("Rutland", 43.6106, -72.9726)] },
    StateInfo { code: "VA", name: "Virginia", cities: &[c("Richmond", 37.5407, -77.4360), c("Virginia Beach", 36.8529, -75.9780), c("Norfolk", 36.8508, -76.2859), c("Charlottesville", 38.0293, -78.4767), c("Roanoke", 37.2710, -79.9414)] },
    StateInfo { code: "WA", name: "Washington", cities: &[c("Seattle", 47.6062, -122.3321), c("Spokane", 47.6588, -117.4260), c("Tacoma", 47.2529, -122.4443), c("Bellingham", 48.7519, -122.4787), c("Olympia", 47.0379, -122.9007), c("Vancouver", 45.6387, -122.6615)] },
    StateInfo { code: "WV", name: "West Virginia", cities: &[c("Charleston", 38.3498, -81.6326), c("Morgantown", 39.6295, -79.9559), c("Huntington", 38.4192, -82.4452)] },
    StateInfo { code: "WI", name: "Wisconsin", cities: &[c("Milwaukee", 43.0389, -87.9065), c("Madison", 43.0731, -89.4012), c("Green Bay", 44.5133, -88.0133), c("Eau Claire", 44.8113, -91.4985)] },
    StateInfo { code: "WY", name: "Wyoming", cities: &[c("Cheyenne", 41.1400, -104.8202), c("Jackson", 43.4799, -110.7624), c("Casper", 42.8666, -106.3131), c("Laramie", 41.3114, -105.5911)] },
    StateInfo { code: "DC", name: "District of Columbia", cities: &[c("Washington", 38.9072, -77.0369)] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_has_a_default_city_inside_bounds() {
        for state in STATES {
            let city = state.default_city();
            assert!(
                US_BOUNDS.contains(city.lat, city.lng),
                "{} default city out of bounds",
                state.code
            );
        }
    }

    #[test]
    fn lookups_are_case_insensitive() {
        assert_eq!(state_by_code("az").map(|s| s.name), Some("Arizona"));
        assert_eq!(state_by_name("arizona").map(|s| s.code), Some("AZ"));
        assert_eq!(find_state("Colorado").map(|s| s.code), Some("CO"));

        let az = state_by_code("AZ").unwrap();
        assert_eq!(az.default_city().name, "Phoenix");
        assert_eq!(az.find_city("tempe").map(|c| c.name), Some("Tempe"));
        assert!(az.find_city("Springfield").is_none());
    }

    #[test]
    fn bounds_reject_other_continents() {
        assert!(!US_BOUNDS.contains(51.5074, -0.1278)); // London
        assert!(US_BOUNDS.contains(COUNTRY_CENTROID.lat, COUNTRY_CENTROID.lng));
    }
}
