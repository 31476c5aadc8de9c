//! Intent execution and reply formatting.
//!
//! The interpreter owns the collaborators it dispatches to but no
//! conversational state: the last reading and city live in a [`VoiceContext`]
//! owned by the caller and handed in on every turn.

use tracing::{info, warn};

use crate::error::{AirError, AirResult, Operation};
use crate::intent::{self, PollutantTerm, VoiceIntent};
use crate::model::{AqiCategory, Coordinates, PollutantReading, RoutePreferences, ScoredRoute};
use crate::scoring;
use crate::traits::{AqiLookup, Geocoder, RouteProvider};

/// Advisory sentence per category, same inclusive upper bounds as the
/// category table.
pub(crate) const SAFETY_ADVICE: [(f64, &str); 6] = [
    (
        50.0,
        "Air quality is good. It's a great time to exercise outdoors.",
    ),
    (
        100.0,
        "Air quality is moderate. Outdoor exercise is fine for most people, but unusually sensitive people should take it easy.",
    ),
    (
        150.0,
        "Air quality is unhealthy for sensitive groups. Children, older adults and people with heart or lung conditions should limit long or intense outdoor activity.",
    ),
    (
        200.0,
        "Air quality is unhealthy. Everyone should cut back on prolonged or heavy outdoor exertion.",
    ),
    (
        300.0,
        "Air quality is very unhealthy. Avoid outdoor exercise and stay indoors if you can.",
    ),
    (
        f64::INFINITY,
        "Air quality is hazardous. Stay indoors and avoid all outdoor activity.",
    ),
];

pub const PM25_DEFINITION: &str = "PM2.5 is fine particulate matter 2.5 micrometers or smaller in diameter. These particles reach deep into the lungs and can enter the bloodstream.";
pub const PM10_DEFINITION: &str = "PM10 is inhalable particulate matter 10 micrometers or smaller in diameter, such as dust and pollen. It irritates the airways and can aggravate asthma.";
pub const HELP_TEXT: &str = "You can ask me things like: what's the air quality in Delhi, check Mumbai, find the best route from Delhi to Gurgaon, is it safe to jog, what is PM2.5, or locate me.";
pub const UNRECOGNIZED_TEXT: &str =
    "Sorry, I didn't understand that. Say help to hear what I can do.";
pub const MISSING_ENDPOINTS_TEXT: &str = "Please repeat your request with both a starting point and a destination, for example: best route from Delhi to Gurgaon.";
pub const ASK_FOR_CITY_TEXT: &str = "Which city would you like me to check?";
pub const NEED_READING_TEXT: &str =
    "I need an air quality reading first. Ask me about a city, then ask again.";

/// Advisory sentence for an AQI value, `None` when the value is unusable.
pub fn safety_advice(aqi: f64) -> Option<&'static str> {
    if scoring::category(aqi) == AqiCategory::Unknown {
        return None;
    }
    SAFETY_ADVICE
        .iter()
        .find(|(upper, _)| aqi <= *upper)
        .map(|(_, advice)| *advice)
}

/// Caller-owned state carried between turns.
#[derive(Debug, Clone, Default)]
pub struct VoiceContext {
    pub last_reading: Option<PollutantReading>,
    pub last_city: Option<String>,
    pub preferences: RoutePreferences,
    /// Device position reported by the front end, used by "locate me".
    pub device_position: Option<Coordinates>,
}

impl VoiceContext {
    pub fn new(preferences: RoutePreferences) -> Self {
        Self {
            preferences,
            ..Self::default()
        }
    }

    fn remember(&mut self, city: &str, reading: &PollutantReading) {
        self.last_city = Some(city.to_string());
        self.last_reading = Some(reading.clone());
    }
}

/// Everything the presentation layer needs after one turn.
#[derive(Debug, Clone)]
pub struct VoiceOutcome {
    pub intent: VoiceIntent,
    pub reply: String,
    pub reading: Option<PollutantReading>,
    pub routes: Option<Vec<ScoredRoute>>,
    pub error: Option<AirError>,
}

impl VoiceOutcome {
    fn reply(intent: VoiceIntent, reply: impl Into<String>) -> Self {
        Self {
            intent,
            reply: reply.into(),
            reading: None,
            routes: None,
            error: None,
        }
    }

    fn failed(intent: VoiceIntent, err: AirError) -> Self {
        warn!(?intent, error = %err, "voice request failed");
        Self {
            intent,
            reply: err.apology(),
            reading: None,
            routes: None,
            error: Some(err),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// "<city> AQI is <value>, considered <category>."
pub fn reading_reply(label: &str, reading: &PollutantReading) -> String {
    match reading.category() {
        AqiCategory::Unknown => {
            format!("I don't have a valid AQI reading for {} right now.", label)
        }
        category => format!(
            "{} AQI is {}, considered {}.",
            label,
            reading.aqi,
            category.phrase()
        ),
    }
}

/// Spoken summary of a ranked route list; wording follows the active flags.
pub fn route_reply(routes: &[ScoredRoute], prefs: &RoutePreferences) -> String {
    let Some(best) = routes.first() else {
        return "I couldn't find any routes.".to_string();
    };
    let count = match routes.len() {
        1 => "1 route".to_string(),
        n => format!("{} routes", n),
    };
    let aqi = if best.has_aqi() {
        format!("has an average AQI of {:.0}", best.aqi_score)
    } else {
        "has no air quality data".to_string()
    };
    let minutes = best.duration_min();

    match (prefs.avoid_high_aqi, prefs.balance_aqi_and_time) {
        (true, false) => format!("I found {}. The cleanest one {}.", count, aqi),
        (false, true) => format!(
            "I found {}. The best balance of air quality and time {} and takes about {:.0} minutes.",
            count, aqi, minutes
        ),
        (true, true) => format!(
            "I found {}. The cleanest route within {:.0} extra minutes {} and takes about {:.0} minutes.",
            count, prefs.max_additional_time_min, aqi, minutes
        ),
        (false, false) => format!(
            "I found {}. The fastest one takes about {:.0} minutes.",
            count, minutes
        ),
    }
}

/// Executes classified intents against the collaborators.
pub struct Interpreter<G, A, R> {
    geocoder: G,
    aqi: A,
    routes: R,
}

impl<G, A, R> Interpreter<G, A, R>
where
    G: Geocoder,
    A: AqiLookup,
    R: RouteProvider,
{
    pub fn new(geocoder: G, aqi: A, routes: R) -> Self {
        Self {
            geocoder,
            aqi,
            routes,
        }
    }

    /// Classify and execute one utterance.
    pub fn handle(&self, utterance: &str, ctx: &mut VoiceContext) -> VoiceOutcome {
        self.execute(intent::classify(utterance), ctx)
    }

    pub fn execute(&self, intent: VoiceIntent, ctx: &mut VoiceContext) -> VoiceOutcome {
        info!(?intent, "executing voice intent");
        match intent.clone() {
            VoiceIntent::RoutePlan { start, end } => {
                let prefs = ctx.preferences;
                match self.plan_route(&start, &end, &prefs) {
                    Ok(ranked) => {
                        let mut outcome = VoiceOutcome::reply(intent, route_reply(&ranked, &prefs));
                        outcome.routes = Some(ranked);
                        outcome
                    }
                    Err(err) => VoiceOutcome::failed(intent, err),
                }
            }
            VoiceIntent::RouteLocationsMissing => VoiceOutcome::reply(intent, MISSING_ENDPOINTS_TEXT),
            VoiceIntent::AqiQuery { city: Some(city) } => self.answer_city(intent, &city, ctx),
            VoiceIntent::AqiQuery { city: None } => match ctx.last_city.clone() {
                Some(city) => self.answer_city(intent, &city, ctx),
                None => VoiceOutcome::reply(intent, ASK_FOR_CITY_TEXT),
            },
            VoiceIntent::CurrentAqiSummary => {
                if let Some(reading) = ctx.last_reading.clone() {
                    let label = ctx
                        .last_city
                        .clone()
                        .unwrap_or_else(|| reading.location.name.clone());
                    let mut outcome = VoiceOutcome::reply(intent, reading_reply(&label, &reading));
                    outcome.reading = Some(reading);
                    outcome
                } else if let Some(city) = ctx.last_city.clone() {
                    self.answer_city(intent, &city, ctx)
                } else {
                    VoiceOutcome::reply(intent, ASK_FOR_CITY_TEXT)
                }
            }
            VoiceIntent::LocateMe => match self.locate(ctx) {
                Ok((label, reading)) => {
                    ctx.remember(&label, &reading);
                    let mut outcome = VoiceOutcome::reply(intent, reading_reply(&label, &reading));
                    outcome.reading = Some(reading);
                    outcome
                }
                Err(err) => VoiceOutcome::failed(intent, err),
            },
            VoiceIntent::SafetyAdvice => {
                let advice = ctx
                    .last_reading
                    .as_ref()
                    .and_then(|reading| safety_advice(f64::from(reading.aqi)));
                VoiceOutcome::reply(intent, advice.unwrap_or(NEED_READING_TEXT))
            }
            VoiceIntent::DefinitionQuery { term } => {
                let text = match term {
                    PollutantTerm::Pm25 => PM25_DEFINITION,
                    PollutantTerm::Pm10 => PM10_DEFINITION,
                };
                VoiceOutcome::reply(intent, text)
            }
            VoiceIntent::HelpRequest => VoiceOutcome::reply(intent, HELP_TEXT),
            VoiceIntent::Unrecognized => VoiceOutcome::reply(intent, UNRECOGNIZED_TEXT),
        }
    }

    /// Resolve a city and fetch its reading.
    ///
    /// A reading without a usable AQI value counts as not found.
    pub fn lookup_city(&self, city: &str) -> AirResult<PollutantReading> {
        let location = self.geocoder.resolve(city)?;
        usable(self.aqi.fetch(&location)?, city)
    }

    /// Resolve both endpoints, fetch candidates and rank them.
    ///
    /// An empty candidate list is reported as `NoRoute`.
    pub fn plan_route(
        &self,
        start: &str,
        end: &str,
        prefs: &RoutePreferences,
    ) -> AirResult<Vec<ScoredRoute>> {
        scoring::validate(prefs)?;
        let from = self.geocoder.resolve(start)?;
        let to = self.geocoder.resolve(end)?;
        let candidates = self.routes.fetch(&from, &to, prefs)?;
        if candidates.is_empty() {
            return Err(AirError::NoRoute {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        scoring::rank(&candidates, prefs)
    }

    fn answer_city(&self, intent: VoiceIntent, city: &str, ctx: &mut VoiceContext) -> VoiceOutcome {
        match self.lookup_city(city) {
            Ok(reading) => {
                ctx.remember(city, &reading);
                let mut outcome = VoiceOutcome::reply(intent, reading_reply(city, &reading));
                outcome.reading = Some(reading);
                outcome
            }
            Err(err) => VoiceOutcome::failed(intent, err),
        }
    }

    fn locate(&self, ctx: &VoiceContext) -> AirResult<(String, PollutantReading)> {
        let position = ctx
            .device_position
            .ok_or_else(|| AirError::not_found(Operation::Locating, "device position"))?;
        let location = self.geocoder.reverse_resolve(position)?;
        let reading = usable(self.aqi.fetch(&location)?, &location.name)?;
        Ok((location.name, reading))
    }
}

fn usable(reading: PollutantReading, label: &str) -> AirResult<PollutantReading> {
    if reading.category() == AqiCategory::Unknown {
        return Err(AirError::not_found(Operation::AqiLookup, label));
    }
    Ok(reading)
}
