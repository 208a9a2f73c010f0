mod security_events;
